//! PostgreSQL implementation of the transactional storage seams.
//!
//! A [`PgTx`] owns one pooled connection for the whole logical operation.
//! `BEGIN` is issued when it is opened; `COMMIT` or `ROLLBACK` when it is
//! finished. A transaction dropped while still open detaches its connection
//! from the pool so the server aborts the transaction when the socket
//! closes, and the connection is never reused mid-transaction.

use async_trait::async_trait;
use deadpool_postgres::Object;
use tokio_postgres::Row;

use haven_core::{
    AttachmentOwner, Message, NewMessage, NewStock, NewVaccination, PetStatus, RecordId,
    RequestStatus, StockEntry, StockUpdate, StorageError, StorageResult, VaccinationEdit,
    VaccinationRecord, WorkflowKind,
};
use haven_storage::{CascadeTx, LedgerTx, RequestState, Transaction, TransactionalStore, WorkflowTx};

use super::{decode_error, storage_error, DbClient};

const STOCK: &str = "ShelterVaccine";
const LEDGER: &str = "VaccinationPet";
const MESSAGES: &str = "Messages";

const STOCK_COLUMNS: &str = "id_shelter_vaccine, vaccine_id, shelter_id, quantity, date";
const LEDGER_COLUMNS: &str = "id_vaccination, pets_id, shelter_id, vaccine_id, quantity, date";

pub struct PgTx {
    conn: Option<Object>,
}

impl PgTx {
    async fn open(conn: Object) -> StorageResult<Self> {
        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| StorageError::TransactionFailed {
                reason: format!("BEGIN failed: {}", e),
            })?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> StorageResult<&Object> {
        self.conn.as_ref().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })
    }

    async fn finish(&mut self, statement: &str) -> StorageResult<()> {
        let conn = self.conn.take().ok_or_else(|| StorageError::TransactionFailed {
            reason: "transaction already finished".to_string(),
        })?;
        match conn.batch_execute(statement).await {
            Ok(()) => Ok(()),
            Err(e) => {
                drop(Object::take(conn));
                Err(StorageError::TransactionFailed {
                    reason: format!("{} failed: {}", statement, e),
                })
            }
        }
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped while open, discarding its connection");
            drop(Object::take(conn));
        }
    }
}

#[async_trait]
impl TransactionalStore for DbClient {
    type Tx = PgTx;

    async fn begin(&self) -> StorageResult<PgTx> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StorageError::TransactionFailed {
                reason: format!("no connection available: {}", e),
            })?;
        PgTx::open(conn).await
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(mut self) -> StorageResult<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(mut self) -> StorageResult<()> {
        self.finish("ROLLBACK").await
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn stock_from_row(row: &Row) -> StorageResult<StockEntry> {
    let decode = decode_error(STOCK);
    Ok(StockEntry {
        id_shelter_vaccine: row.try_get("id_shelter_vaccine").map_err(&decode)?,
        vaccine_id: row.try_get("vaccine_id").map_err(&decode)?,
        shelter_id: row.try_get("shelter_id").map_err(&decode)?,
        quantity: row.try_get("quantity").map_err(&decode)?,
        date: row.try_get("date").map_err(&decode)?,
    })
}

fn ledger_from_row(row: &Row) -> StorageResult<VaccinationRecord> {
    let decode = decode_error(LEDGER);
    Ok(VaccinationRecord {
        id_vaccination: row.try_get("id_vaccination").map_err(&decode)?,
        pets_id: row.try_get("pets_id").map_err(&decode)?,
        shelter_id: row.try_get("shelter_id").map_err(&decode)?,
        vaccine_id: row.try_get("vaccine_id").map_err(&decode)?,
        quantity: row.try_get("quantity").map_err(&decode)?,
        date: row.try_get("date").map_err(&decode)?,
    })
}

fn message_from_row(row: &Row) -> StorageResult<Message> {
    let decode = decode_error(MESSAGES);
    Ok(Message {
        id_message: row.try_get("id_message").map_err(&decode)?,
        creator: row.try_get("creator").map_err(&decode)?,
        message: row.try_get("message").map_err(&decode)?,
        user_id: row.try_get("user_id").map_err(&decode)?,
        status: row.try_get("status").map_err(&decode)?,
    })
}

// ============================================================================
// INVENTORY
// ============================================================================

#[async_trait]
impl LedgerTx for PgTx {
    async fn stock_for_update(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
    ) -> StorageResult<Option<StockEntry>> {
        let sql = format!(
            "SELECT {} FROM \"ShelterVaccine\" WHERE vaccine_id = $1 AND shelter_id = $2 FOR UPDATE",
            STOCK_COLUMNS
        );
        let row = self
            .conn()?
            .query_opt(&sql, &[&vaccine_id, &shelter_id])
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        row.as_ref().map(stock_from_row).transpose()
    }

    async fn stock_decrement_if_available(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE \"ShelterVaccine\" SET quantity = quantity - $3 \
                 WHERE vaccine_id = $1 AND shelter_id = $2 AND quantity >= $3",
                &[&vaccine_id, &shelter_id, &quantity],
            )
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        Ok(updated > 0)
    }

    async fn stock_increment(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE \"ShelterVaccine\" SET quantity = quantity + $3 \
                 WHERE vaccine_id = $1 AND shelter_id = $2",
                &[&vaccine_id, &shelter_id, &quantity],
            )
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        Ok(updated > 0)
    }

    async fn stock_insert(&mut self, stock: &NewStock) -> StorageResult<StockEntry> {
        let sql = format!(
            "INSERT INTO \"ShelterVaccine\" (vaccine_id, shelter_id, quantity, date) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            STOCK_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                &sql,
                &[&stock.vaccine_id, &stock.shelter_id, &stock.quantity, &stock.date],
            )
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        stock_from_row(&row)
    }

    async fn stock_update(
        &mut self,
        id: RecordId,
        update: &StockUpdate,
    ) -> StorageResult<Option<StockEntry>> {
        let sql = format!(
            "UPDATE \"ShelterVaccine\" SET quantity = COALESCE($1, quantity), date = COALESCE($2, date) \
             WHERE id_shelter_vaccine = $3 RETURNING {}",
            STOCK_COLUMNS
        );
        let row = self
            .conn()?
            .query_opt(&sql, &[&update.quantity, &update.date, &id])
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        row.as_ref().map(stock_from_row).transpose()
    }

    async fn stock_delete(&mut self, id: RecordId) -> StorageResult<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM \"ShelterVaccine\" WHERE id_shelter_vaccine = $1",
                &[&id],
            )
            .await
            .map_err(|e| storage_error(STOCK, e))?;
        Ok(deleted > 0)
    }

    async fn ledger_get(&mut self, id: RecordId) -> StorageResult<Option<VaccinationRecord>> {
        let sql = format!(
            "SELECT {} FROM \"VaccinationPet\" WHERE id_vaccination = $1 FOR UPDATE",
            LEDGER_COLUMNS
        );
        let row = self
            .conn()?
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| storage_error(LEDGER, e))?;
        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn ledger_insert(&mut self, record: &NewVaccination) -> StorageResult<VaccinationRecord> {
        let sql = format!(
            "INSERT INTO \"VaccinationPet\" (pets_id, shelter_id, vaccine_id, quantity, date) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            LEDGER_COLUMNS
        );
        let row = self
            .conn()?
            .query_one(
                &sql,
                &[
                    &record.pets_id,
                    &record.shelter_id,
                    &record.vaccine_id,
                    &record.quantity,
                    &record.date,
                ],
            )
            .await
            .map_err(|e| storage_error(LEDGER, e))?;
        ledger_from_row(&row)
    }

    async fn ledger_update(
        &mut self,
        id: RecordId,
        edit: &VaccinationEdit,
    ) -> StorageResult<Option<VaccinationRecord>> {
        let sql = format!(
            "UPDATE \"VaccinationPet\" SET pets_id = $1, vaccine_id = $2, quantity = $3, date = $4 \
             WHERE id_vaccination = $5 RETURNING {}",
            LEDGER_COLUMNS
        );
        let row = self
            .conn()?
            .query_opt(
                &sql,
                &[&edit.pets_id, &edit.vaccine_id, &edit.quantity, &edit.date, &id],
            )
            .await
            .map_err(|e| storage_error(LEDGER, e))?;
        row.as_ref().map(ledger_from_row).transpose()
    }

    async fn ledger_delete(&mut self, id: RecordId) -> StorageResult<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM \"VaccinationPet\" WHERE id_vaccination = $1", &[&id])
            .await
            .map_err(|e| storage_error(LEDGER, e))?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// WORKFLOW
// ============================================================================

#[async_trait]
impl WorkflowTx for PgTx {
    async fn request_for_update(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
    ) -> StorageResult<Option<RequestState>> {
        let sql = format!(
            "SELECT status_adoption_id, pets_id FROM {} WHERE {} = $1 FOR UPDATE",
            kind.table(),
            kind.pk_column()
        );
        let entity = kind.entity_name();
        let row = self
            .conn()?
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| storage_error(entity, e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let decode = decode_error(entity);
        let code: i32 = row.try_get("status_adoption_id").map_err(&decode)?;
        let pets_id: RecordId = row.try_get("pets_id").map_err(&decode)?;
        let status = RequestStatus::from_code(code).ok_or_else(|| StorageError::Decode {
            entity,
            reason: format!("unknown request status code {}", code),
        })?;
        Ok(Some(RequestState { status, pets_id }))
    }

    async fn request_set_status(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
        status: RequestStatus,
    ) -> StorageResult<bool> {
        let sql = format!(
            "UPDATE {} SET status_adoption_id = $1 WHERE {} = $2",
            kind.table(),
            kind.pk_column()
        );
        let updated = self
            .conn()?
            .execute(&sql, &[&status.code(), &id])
            .await
            .map_err(|e| storage_error(kind.entity_name(), e))?;
        Ok(updated > 0)
    }

    async fn pet_set_status(&mut self, pet_id: RecordId, status: PetStatus) -> StorageResult<bool> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE \"Pets\" SET status_id = $1 WHERE id_pets = $2",
                &[&status.code(), &pet_id],
            )
            .await
            .map_err(|e| storage_error("Pet", e))?;
        Ok(updated > 0)
    }

    async fn message_insert(&mut self, message: &NewMessage) -> StorageResult<Message> {
        let row = self
            .conn()?
            .query_one(
                "INSERT INTO \"Messages\" (creator, message, user_id, status) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id_message, creator, message, user_id, status",
                &[
                    &message.creator,
                    &message.message,
                    &message.user_id,
                    &message.decision.as_tag(),
                ],
            )
            .await
            .map_err(|e| storage_error(MESSAGES, e))?;
        message_from_row(&row)
    }
}

// ============================================================================
// CASCADING DELETE
// ============================================================================

#[async_trait]
impl CascadeTx for PgTx {
    async fn attachment_urls(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>> {
        let sql = format!(
            "SELECT image_url FROM {} WHERE {} = $1 ORDER BY id_image",
            owner.table(),
            owner.parent_column()
        );
        let rows = self
            .conn()?
            .query(&sql, &[&parent_id])
            .await
            .map_err(|e| storage_error(owner.name(), e))?;
        rows.iter()
            .map(|row| row.try_get("image_url").map_err(decode_error(owner.name())))
            .collect()
    }

    async fn attachments_delete_all(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            owner.table(),
            owner.parent_column()
        );
        self.conn()?
            .execute(&sql, &[&parent_id])
            .await
            .map_err(|e| storage_error(owner.name(), e))
    }

    async fn record_delete(
        &mut self,
        table: &'static str,
        pk_column: &'static str,
        id: RecordId,
    ) -> StorageResult<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", table, pk_column);
        let deleted = self
            .conn()?
            .execute(&sql, &[&id])
            .await
            .map_err(|e| storage_error(table, e))?;
        Ok(deleted > 0)
    }
}
