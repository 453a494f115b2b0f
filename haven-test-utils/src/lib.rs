//! Haven Test Utilities
//!
//! Shared test infrastructure for the Haven workspace:
//! - Fixtures for stock rows, vaccinations and decisions
//! - Seeding helpers over the in-memory store
//! - Proptest generators for statuses, decisions and dose plans

pub use haven_storage::{FaultPlan, InMemoryObjectStore, InMemoryStore};

pub use haven_core::{
    Date, Decision, NewMessage, NewStock, NewVaccination, PetStatus, RecordId, RequestStatus,
    StockEntry, VaccinationEdit, VaccinationRecord, WorkflowKind,
};

/// Endpoint every in-memory object store in the tests is built with.
pub const TEST_STORAGE_ENDPOINT: &str = "https://storage.test";
pub const TEST_BUCKET: &str = "haven";

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;
    use chrono::Duration;

    /// Expiry far enough ahead that no test run reaches it.
    pub fn far_future() -> Date {
        haven_core::today() + Duration::days(3650)
    }

    pub fn yesterday() -> Date {
        haven_core::today() - Duration::days(1)
    }

    pub fn new_stock(vaccine_id: RecordId, shelter_id: RecordId, quantity: i32) -> NewStock {
        NewStock {
            vaccine_id,
            shelter_id,
            quantity,
            date: far_future(),
        }
    }

    pub fn new_vaccination(
        pets_id: RecordId,
        vaccine_id: RecordId,
        shelter_id: RecordId,
        quantity: i32,
    ) -> NewVaccination {
        NewVaccination {
            pets_id,
            shelter_id,
            vaccine_id,
            quantity,
            date: haven_core::today(),
        }
    }

    /// Edit that keeps the pet and date of `row`.
    pub fn edit_of(row: &VaccinationRecord, vaccine_id: RecordId, quantity: i32) -> VaccinationEdit {
        VaccinationEdit {
            pets_id: row.pets_id,
            vaccine_id,
            quantity,
            date: row.date,
        }
    }

    pub fn audit(decision: Decision) -> NewMessage {
        NewMessage {
            creator: Some(1),
            message: format!("Request {}", decision),
            user_id: Some(42),
            decision,
        }
    }

    pub fn object_store() -> InMemoryObjectStore {
        InMemoryObjectStore::new(TEST_STORAGE_ENDPOINT, TEST_BUCKET)
    }

    /// Seed a pet and a request of `kind` pointing at it.
    pub async fn seed_workflow(
        store: &InMemoryStore,
        kind: WorkflowKind,
        pet_status: PetStatus,
        request_status: RequestStatus,
    ) -> (RecordId, RecordId) {
        let pet_id = store.seed_pet(pet_status).await;
        let request_id = store.seed_request(kind, pet_id, request_status).await;
        (pet_id, request_id)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Haven domain values.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_decision() -> impl Strategy<Value = Decision> {
        prop_oneof![Just(Decision::Accept), Just(Decision::Cancel)]
    }

    pub fn arb_workflow_kind() -> impl Strategy<Value = WorkflowKind> {
        prop_oneof![Just(WorkflowKind::ContentRequest), Just(WorkflowKind::Adoption)]
    }

    pub fn arb_request_status() -> impl Strategy<Value = RequestStatus> {
        prop_oneof![
            Just(RequestStatus::Reset),
            Just(RequestStatus::Pending),
            Just(RequestStatus::Accepted),
        ]
    }

    pub fn arb_pet_status() -> impl Strategy<Value = PetStatus> {
        prop_oneof![
            Just(PetStatus::Available),
            Just(PetStatus::Reserved),
            Just(PetStatus::Adopted),
        ]
    }

    /// Dose count for one vaccination.
    pub fn arb_dose() -> impl Strategy<Value = i32> {
        1i32..=8
    }

    /// Starting stock and a sequence of bookings against it.
    pub fn arb_dose_plan() -> impl Strategy<Value = (i32, Vec<i32>)> {
        (0i32..=40, prop::collection::vec(arb_dose(), 1..12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_dates_straddle_today() {
        assert!(fixtures::yesterday() < haven_core::today());
        assert!(fixtures::far_future() > haven_core::today());
    }

    #[test]
    fn test_edit_keeps_pet_and_date() {
        let row = VaccinationRecord {
            id_vaccination: 3,
            pets_id: 9,
            shelter_id: 1,
            vaccine_id: 2,
            quantity: 1,
            date: fixtures::far_future(),
        };
        let edit = fixtures::edit_of(&row, 5, 2);
        assert_eq!(edit.pets_id, 9);
        assert_eq!(edit.date, row.date);
        assert_eq!(edit.vaccine_id, 5);
    }
}
