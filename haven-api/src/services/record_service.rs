//! Record Service
//!
//! Deleting a record together with its attachments.

use tracing::info;

use haven_core::{RecordId, StorageError};
use haven_storage::{CascadeTx, ObjectStore, Transaction, TransactionalStore};

use crate::component::Listable;

use super::{abort, purge_objects};

/// Delete the row `id` of kind `C` and its attachment rows in one
/// transaction, then remove the remote objects best-effort.
///
/// Returns the URLs that were attached to the record.
pub async fn delete_record<C, S>(
    store: &S,
    objects: &dyn ObjectStore,
    id: RecordId,
) -> Result<Vec<String>, StorageError>
where
    C: Listable,
    S: TransactionalStore,
{
    let mut tx = store.begin().await?;
    let urls = match cascade::<C, _>(&mut tx, id).await {
        Ok(urls) => urls,
        Err(e) => {
            abort(tx, "delete_record").await;
            return Err(e);
        }
    };
    tx.commit().await?;

    info!(entity = C::ENTITY_NAME, record_id = id, attachments = urls.len(), "Record deleted");
    purge_objects(objects, &urls).await;
    Ok(urls)
}

async fn cascade<C: Listable, T: CascadeTx>(
    tx: &mut T,
    id: RecordId,
) -> Result<Vec<String>, StorageError> {
    let urls = match C::ATTACHMENTS {
        Some(owner) => {
            let urls = tx.attachment_urls(owner, id).await?;
            tx.attachments_delete_all(owner, id).await?;
            urls
        }
        None => Vec::new(),
    };

    if !tx.record_delete(C::TABLE, C::PK_FIELD, id).await? {
        return Err(StorageError::NotFound {
            entity: C::ENTITY_NAME,
            id,
        });
    }
    Ok(urls)
}
