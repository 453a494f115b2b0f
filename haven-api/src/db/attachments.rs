//! Attachment rows on the pooled client.

use async_trait::async_trait;

use haven_core::{AttachmentOwner, RecordId, StorageError, StorageResult};
use haven_storage::AttachmentRepository;

use super::{decode_error, storage_error, DbClient};

impl DbClient {
    async fn storage_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| StorageError::Database {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl AttachmentRepository for DbClient {
    async fn attachment_insert(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<()> {
        let conn = self.storage_conn().await?;
        let sql = format!(
            "INSERT INTO {} ({}, image_url) VALUES ($1, $2)",
            owner.table(),
            owner.parent_column()
        );
        conn.execute(&sql, &[&parent_id, &url])
            .await
            .map_err(|e| storage_error(owner.name(), e))?;
        Ok(())
    }

    async fn attachment_delete(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<bool> {
        let conn = self.storage_conn().await?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND image_url = $2",
            owner.table(),
            owner.parent_column()
        );
        let removed = conn
            .execute(&sql, &[&parent_id, &url])
            .await
            .map_err(|e| storage_error(owner.name(), e))?;
        Ok(removed > 0)
    }

    async fn attachment_list(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>> {
        let conn = self.storage_conn().await?;
        let sql = format!(
            "SELECT image_url FROM {} WHERE {} = $1 ORDER BY id_image",
            owner.table(),
            owner.parent_column()
        );
        let rows = conn
            .query(&sql, &[&parent_id])
            .await
            .map_err(|e| storage_error(owner.name(), e))?;
        rows.iter()
            .map(|row| row.try_get("image_url").map_err(decode_error(owner.name())))
            .collect()
    }
}
