//! In-memory implementation of every storage seam.
//!
//! A transaction holds the store's lock for its whole lifetime and works on
//! a copy of the state. Commit swaps the copy in; drop discards it. This
//! gives serializable isolation, which is enough for engine tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use haven_core::{
    Attachment, AttachmentOwner, Message, NewMessage, NewStock, NewVaccination, PetStatus,
    RecordId, RequestStatus, StockEntry, StockUpdate, StorageError, StorageResult,
    VaccinationEdit, VaccinationRecord, WorkflowKind,
};

use crate::traits::{
    AttachmentRepository, CascadeTx, LedgerTx, RequestState, Transaction, TransactionalStore,
    WorkflowTx,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: RecordId,
    pets: BTreeMap<RecordId, PetStatus>,
    requests: BTreeMap<(WorkflowKind, RecordId), RequestState>,
    messages: Vec<Message>,
    stock: BTreeMap<RecordId, StockEntry>,
    ledger: BTreeMap<RecordId, VaccinationRecord>,
    attachments: Vec<Attachment>,
    records: BTreeSet<(&'static str, RecordId)>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn stock_key(&self, vaccine_id: RecordId, shelter_id: RecordId) -> Option<RecordId> {
        self.stock
            .values()
            .find(|s| s.vaccine_id == vaccine_id && s.shelter_id == shelter_id)
            .map(|s| s.id_shelter_vaccine)
    }
}

/// Statements that fail on demand, for rollback tests.
#[derive(Debug, Default)]
pub struct FaultPlan {
    pub fail_pet_update: AtomicBool,
    pub fail_message_insert: AtomicBool,
    pub fail_ledger_update: AtomicBool,
}

fn check_fault(flag: &AtomicBool, statement: &str) -> StorageResult<()> {
    if flag.load(Ordering::SeqCst) {
        Err(StorageError::Database {
            reason: format!("injected failure in {}", statement),
        })
    } else {
        Ok(())
    }
}

/// Shared in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultPlan>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    // === Seeding ===

    pub async fn seed_pet(&self, status: PetStatus) -> RecordId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.pets.insert(id, status);
        state.records.insert(("\"Pets\"", id));
        id
    }

    pub async fn seed_request(
        &self,
        kind: WorkflowKind,
        pets_id: RecordId,
        status: RequestStatus,
    ) -> RecordId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.requests.insert((kind, id), RequestState { status, pets_id });
        id
    }

    pub async fn seed_stock(&self, stock: NewStock) -> StockEntry {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let entry = StockEntry {
            id_shelter_vaccine: id,
            vaccine_id: stock.vaccine_id,
            shelter_id: stock.shelter_id,
            quantity: stock.quantity,
            date: stock.date,
        };
        state.stock.insert(id, entry.clone());
        entry
    }

    /// Registers a row of `table` so it can be cascade-deleted.
    pub async fn seed_record(&self, table: &'static str) -> RecordId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.records.insert((table, id));
        id
    }

    // === Inspection ===

    pub async fn pet_status(&self, pet_id: RecordId) -> Option<PetStatus> {
        self.state.lock().await.pets.get(&pet_id).copied()
    }

    pub async fn request_state(&self, kind: WorkflowKind, id: RecordId) -> Option<RequestState> {
        self.state.lock().await.requests.get(&(kind, id)).copied()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn stock_quantity(&self, vaccine_id: RecordId, shelter_id: RecordId) -> Option<i32> {
        let state = self.state.lock().await;
        state
            .stock_key(vaccine_id, shelter_id)
            .and_then(|id| state.stock.get(&id))
            .map(|s| s.quantity)
    }

    pub async fn ledger_row(&self, id: RecordId) -> Option<VaccinationRecord> {
        self.state.lock().await.ledger.get(&id).cloned()
    }

    pub async fn ledger_len(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    pub async fn record_exists(&self, table: &'static str, id: RecordId) -> bool {
        self.state.lock().await.records.contains(&(table, id))
    }
}

/// Transaction over [`InMemoryStore`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<FaultPlan>,
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StorageResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        })
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn commit(self) -> StorageResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> StorageResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn stock_for_update(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
    ) -> StorageResult<Option<StockEntry>> {
        let state = &self.working;
        Ok(state
            .stock_key(vaccine_id, shelter_id)
            .and_then(|id| state.stock.get(&id))
            .cloned())
    }

    async fn stock_decrement_if_available(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool> {
        let Some(id) = self.working.stock_key(vaccine_id, shelter_id) else {
            return Ok(false);
        };
        match self.working.stock.get_mut(&id) {
            Some(entry) if entry.quantity >= quantity => {
                entry.quantity -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stock_increment(
        &mut self,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> StorageResult<bool> {
        let Some(id) = self.working.stock_key(vaccine_id, shelter_id) else {
            return Ok(false);
        };
        match self.working.stock.get_mut(&id) {
            Some(entry) => {
                entry.quantity += quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stock_insert(&mut self, stock: &NewStock) -> StorageResult<StockEntry> {
        if self
            .working
            .stock_key(stock.vaccine_id, stock.shelter_id)
            .is_some()
        {
            return Err(StorageError::Conflict {
                entity: "ShelterVaccine",
                field: "vaccine_id, shelter_id".to_string(),
            });
        }
        let id = self.working.allocate_id();
        let entry = StockEntry {
            id_shelter_vaccine: id,
            vaccine_id: stock.vaccine_id,
            shelter_id: stock.shelter_id,
            quantity: stock.quantity,
            date: stock.date,
        };
        self.working.stock.insert(id, entry.clone());
        Ok(entry)
    }

    async fn stock_update(
        &mut self,
        id: RecordId,
        update: &StockUpdate,
    ) -> StorageResult<Option<StockEntry>> {
        Ok(self.working.stock.get_mut(&id).map(|entry| {
            if let Some(quantity) = update.quantity {
                entry.quantity = quantity;
            }
            if let Some(date) = update.date {
                entry.date = date;
            }
            entry.clone()
        }))
    }

    async fn stock_delete(&mut self, id: RecordId) -> StorageResult<bool> {
        Ok(self.working.stock.remove(&id).is_some())
    }

    async fn ledger_get(&mut self, id: RecordId) -> StorageResult<Option<VaccinationRecord>> {
        Ok(self.working.ledger.get(&id).cloned())
    }

    async fn ledger_insert(&mut self, record: &NewVaccination) -> StorageResult<VaccinationRecord> {
        let id = self.working.allocate_id();
        let row = VaccinationRecord {
            id_vaccination: id,
            pets_id: record.pets_id,
            shelter_id: record.shelter_id,
            vaccine_id: record.vaccine_id,
            quantity: record.quantity,
            date: record.date,
        };
        self.working.ledger.insert(id, row.clone());
        Ok(row)
    }

    async fn ledger_update(
        &mut self,
        id: RecordId,
        edit: &VaccinationEdit,
    ) -> StorageResult<Option<VaccinationRecord>> {
        check_fault(&self.faults.fail_ledger_update, "ledger_update")?;
        Ok(self.working.ledger.get_mut(&id).map(|row| {
            row.pets_id = edit.pets_id;
            row.vaccine_id = edit.vaccine_id;
            row.quantity = edit.quantity;
            row.date = edit.date;
            row.clone()
        }))
    }

    async fn ledger_delete(&mut self, id: RecordId) -> StorageResult<bool> {
        Ok(self.working.ledger.remove(&id).is_some())
    }
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn request_for_update(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
    ) -> StorageResult<Option<RequestState>> {
        Ok(self.working.requests.get(&(kind, id)).copied())
    }

    async fn request_set_status(
        &mut self,
        kind: WorkflowKind,
        id: RecordId,
        status: RequestStatus,
    ) -> StorageResult<bool> {
        Ok(match self.working.requests.get_mut(&(kind, id)) {
            Some(state) => {
                state.status = status;
                true
            }
            None => false,
        })
    }

    async fn pet_set_status(&mut self, pet_id: RecordId, status: PetStatus) -> StorageResult<bool> {
        check_fault(&self.faults.fail_pet_update, "pet_set_status")?;
        Ok(match self.working.pets.get_mut(&pet_id) {
            Some(current) => {
                *current = status;
                true
            }
            None => false,
        })
    }

    async fn message_insert(&mut self, message: &NewMessage) -> StorageResult<Message> {
        check_fault(&self.faults.fail_message_insert, "message_insert")?;
        let id = self.working.allocate_id();
        let row = Message {
            id_message: id,
            creator: message.creator,
            message: message.message.clone(),
            user_id: message.user_id,
            status: message.decision.as_tag().to_string(),
        };
        self.working.messages.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl CascadeTx for MemoryTx {
    async fn attachment_urls(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>> {
        Ok(self
            .working
            .attachments
            .iter()
            .filter(|a| a.owner == owner && a.parent_id == parent_id)
            .map(|a| a.image_url.clone())
            .collect())
    }

    async fn attachments_delete_all(
        &mut self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<u64> {
        let before = self.working.attachments.len();
        self.working
            .attachments
            .retain(|a| !(a.owner == owner && a.parent_id == parent_id));
        Ok((before - self.working.attachments.len()) as u64)
    }

    async fn record_delete(
        &mut self,
        table: &'static str,
        _pk_column: &'static str,
        id: RecordId,
    ) -> StorageResult<bool> {
        if table == "\"Pets\"" {
            self.working.pets.remove(&id);
        }
        Ok(self.working.records.remove(&(table, id)))
    }
}

#[async_trait]
impl AttachmentRepository for InMemoryStore {
    async fn attachment_insert(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state
            .attachments
            .push(Attachment::new(owner, parent_id, url));
        Ok(())
    }

    async fn attachment_delete(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
        url: &str,
    ) -> StorageResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.attachments.len();
        state
            .attachments
            .retain(|a| !(a.owner == owner && a.parent_id == parent_id && a.image_url == url));
        Ok(state.attachments.len() != before)
    }

    async fn attachment_list(
        &self,
        owner: AttachmentOwner,
        parent_id: RecordId,
    ) -> StorageResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .attachments
            .iter()
            .filter(|a| a.owner == owner && a.parent_id == parent_id)
            .map(|a| a.image_url.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::Date;

    fn expiry() -> Date {
        Date::from_ymd_opt(2099, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        let stock = store
            .seed_stock(NewStock {
                vaccine_id: 1,
                shelter_id: 1,
                quantity: 4,
                date: expiry(),
            })
            .await;

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.stock_decrement_if_available(1, 1, 3).await.unwrap());
        }

        assert_eq!(store.stock_quantity(1, 1).await, Some(4));
        assert_eq!(stock.quantity, 4);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = InMemoryStore::new();
        store
            .seed_stock(NewStock {
                vaccine_id: 1,
                shelter_id: 1,
                quantity: 4,
                date: expiry(),
            })
            .await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.stock_decrement_if_available(1, 1, 4).await.unwrap());
        assert!(!tx.stock_decrement_if_available(1, 1, 1).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.stock_quantity(1, 1).await, Some(0));
    }

    #[tokio::test]
    async fn test_requests_are_keyed_by_kind() {
        let store = InMemoryStore::new();
        let pet = store.seed_pet(PetStatus::Available).await;
        let content = store
            .seed_request(WorkflowKind::ContentRequest, pet, RequestStatus::Pending)
            .await;
        let adoption = store
            .seed_request(WorkflowKind::Adoption, pet, RequestStatus::Accepted)
            .await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx
            .request_set_status(WorkflowKind::ContentRequest, content, RequestStatus::Reset)
            .await
            .unwrap());
        assert!(!tx
            .request_set_status(WorkflowKind::Adoption, content, RequestStatus::Reset)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let state = store
            .request_state(WorkflowKind::ContentRequest, content)
            .await
            .unwrap();
        assert_eq!(state.status, RequestStatus::Reset);
        assert_eq!(state.pets_id, pet);
        assert!(store
            .request_state(WorkflowKind::ContentRequest, adoption)
            .await
            .is_none());
        assert_eq!(
            store
                .request_state(WorkflowKind::Adoption, adoption)
                .await
                .map(|s| s.status),
            Some(RequestStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn test_duplicate_stock_conflicts() {
        let store = InMemoryStore::new();
        let new = NewStock {
            vaccine_id: 2,
            shelter_id: 3,
            quantity: 1,
            date: expiry(),
        };
        store.seed_stock(new.clone()).await;
        let mut tx = store.begin().await.unwrap();
        let err = tx.stock_insert(&new).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_attachment_repository_scopes_by_owner() {
        let store = InMemoryStore::new();
        store
            .attachment_insert(AttachmentOwner::Pet, 1, "https://s/b/a.png")
            .await
            .unwrap();
        store
            .attachment_insert(AttachmentOwner::Fund, 1, "https://s/b/b.png")
            .await
            .unwrap();

        let pet = store.attachment_list(AttachmentOwner::Pet, 1).await.unwrap();
        assert_eq!(pet, vec!["https://s/b/a.png".to_string()]);

        assert!(!store
            .attachment_delete(AttachmentOwner::Pet, 1, "https://s/b/b.png")
            .await
            .unwrap());
    }
}
