//! Storage seams the engines are written against.
//!
//! A logical operation acquires one [`Transaction`] from a
//! [`TransactionalStore`] and performs every statement on it. Dropping a
//! transaction without committing rolls it back.

use async_trait::async_trait;
use haven_core::{
    AttachmentOwner, Message, NewMessage, NewStock, NewVaccination, PetStatus, RecordId,
    RequestStatus, StockEntry, StockUpdate, StorageResult, VaccinationEdit, VaccinationRecord,
    WorkflowKind,
};

/// Status and pet link of a workflow request, read under a row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestState {
    pub status: RequestStatus,
    pub pets_id: RecordId,
}

#[async_trait]
pub trait Transaction: Send {
    async fn commit(self) -> StorageResult<()>;

    async fn rollback(self) -> StorageResult<()>;
}

/// Vaccine stock and vaccination ledger statements.
#[async_trait]
pub trait LedgerTx: Transaction {
    /// Stock row for `(vaccine_id, shelter_id)`, locked until the transaction ends.
    async fn stock_for_update(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
    ) -> StorageResult<Option<StockEntry>>;

    /// Single-statement `quantity = quantity - n WHERE quantity >= n`.
    /// Returns whether a row was updated.
    async fn stock_decrement_if_available(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool>;

    /// Returns whether a row was updated.
    async fn stock_increment(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool>;

    async fn stock_insert(&mut self, stock: &NewStock) -> StorageResult<StockEntry>;

    async fn stock_update(
        &mut self,
        id: RecordId,
        update: &StockUpdate,
    ) -> StorageResult<Option<StockEntry>>;

    async fn stock_delete(&mut self, id: RecordId) -> StorageResult<bool>;

    /// Ledger row, locked until the transaction ends.
    async fn ledger_get(&mut self, id: RecordId) -> StorageResult<Option<VaccinationRecord>>;

    async fn ledger_insert(&mut self, record: &NewVaccination) -> StorageResult<VaccinationRecord>;

    async fn ledger_update(
        &mut self,
        id: RecordId,
        edit: &VaccinationEdit,
    ) -> StorageResult<Option<VaccinationRecord>>;

    async fn ledger_delete(&mut self, id: RecordId) -> StorageResult<bool>;
}

/// Workflow request, pet status and audit message statements.
#[async_trait]
pub trait WorkflowTx: Transaction {
    async fn request_for_update(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
    ) -> StorageResult<Option<RequestState>>;

    async fn request_set_status(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
        status: RequestStatus,
    ) -> StorageResult<bool>;

    async fn pet_set_status(&mut self, pet_id: RecordId, status: PetStatus) -> StorageResult<bool>;

    async fn message_insert(&mut self, message: &NewMessage) -> StorageResult<Message>;
}

/// Record deletion together with its attachment rows.
#[async_trait]
pub trait CascadeTx: Transaction {
    async fn attachment_urls(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>>;

    async fn attachments_delete_all(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<u64>;

    /// Returns whether the record existed.
    async fn record_delete(
        &mut self,
        table: &'static str,
        pk_column: &'static str,
        id: RecordId,
    ) -> StorageResult<bool>;
}

/// Source of transactions.
#[async_trait]
pub trait TransactionalStore: Send + Sync + 'static {
    type Tx: LedgerTx + WorkflowTx + CascadeTx;

    async fn begin(&self) -> StorageResult<Self::Tx>;
}

/// Attachment rows, written outside any transaction.
#[async_trait]
pub trait AttachmentRepository: Send + Sync + 'static {
    async fn attachment_insert(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<()>;

    /// Returns whether a row was removed.
    async fn attachment_delete(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<bool>;

    async fn attachment_list(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>>;
}
