//! Property-Based Tests for the Decision Service
//!
//! A decision moves the request, its pet and the audit log together or not
//! at all, and is announced only after it commits.

use std::sync::atomic::Ordering;

use haven_api::events::ChangeEvent;
use haven_api::services::apply_decision;
use haven_api::telemetry::METRICS;
use haven_api::ws::WsState;
use haven_core::{Decision, PetStatus, RequestStatus, WorkflowError, WorkflowKind};
use haven_test_utils::fixtures::{audit, seed_workflow};
use haven_test_utils::generators::{arb_decision, arb_pet_status, arb_request_status, arb_workflow_kind};
use haven_test_utils::InMemoryStore;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// ============================================================================
// TRANSITIONS
// ============================================================================

#[tokio::test]
async fn test_accept_content_request_reserves_pet() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (pet, request) = seed_workflow(
        &store,
        WorkflowKind::ContentRequest,
        PetStatus::Available,
        RequestStatus::Pending,
    )
    .await;

    let message = apply_decision(&store, &ws, WorkflowKind::ContentRequest, request, &audit(Decision::Accept))
        .await
        .expect("decision");

    assert_eq!(message.status, "accept");
    assert_eq!(store.pet_status(pet).await, Some(PetStatus::Reserved));
    let state = store
        .request_state(WorkflowKind::ContentRequest, request)
        .await
        .expect("request");
    assert_eq!(state.status, RequestStatus::Accepted);
}

#[tokio::test]
async fn test_accept_adoption_marks_pet_adopted() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (pet, request) = seed_workflow(
        &store,
        WorkflowKind::Adoption,
        PetStatus::Reserved,
        RequestStatus::Pending,
    )
    .await;

    apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Accept))
        .await
        .expect("decision");

    assert_eq!(store.pet_status(pet).await, Some(PetStatus::Adopted));
}

#[tokio::test]
async fn test_cancel_frees_pet_and_resets_request() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (pet, request) = seed_workflow(
        &store,
        WorkflowKind::Adoption,
        PetStatus::Adopted,
        RequestStatus::Accepted,
    )
    .await;

    apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Cancel))
        .await
        .expect("decision");

    assert_eq!(store.pet_status(pet).await, Some(PetStatus::Available));
    let state = store
        .request_state(WorkflowKind::Adoption, request)
        .await
        .expect("request");
    assert_eq!(state.status, RequestStatus::Reset);
}

#[tokio::test]
async fn test_second_accept_is_a_conflict() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (_, request) = seed_workflow(
        &store,
        WorkflowKind::ContentRequest,
        PetStatus::Available,
        RequestStatus::Pending,
    )
    .await;
    let decision = audit(Decision::Accept);

    apply_decision(&store, &ws, WorkflowKind::ContentRequest, request, &decision)
        .await
        .expect("first decision");
    let (_, mut rx) = ws.subscribe();
    let err = apply_decision(&store, &ws, WorkflowKind::ContentRequest, request, &decision)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::AlreadyApplied { .. }));
    assert_eq!(store.messages().await.len(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_repeated_decision_is_counted() {
    let metrics = METRICS.as_ref().expect("metrics");
    let repeats = || {
        metrics
            .decisions
            .with_label_values(&["AdoptionApplication", "cancel", "already_applied"])
            .get()
    };
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (_, request) = seed_workflow(
        &store,
        WorkflowKind::Adoption,
        PetStatus::Available,
        RequestStatus::Reset,
    )
    .await;

    let before = repeats();
    apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Cancel))
        .await
        .unwrap_err();
    assert!(repeats() > before);
}

#[tokio::test]
async fn test_unknown_request() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let err = apply_decision(&store, &ws, WorkflowKind::Adoption, 404, &audit(Decision::Accept))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::RequestNotFound { id: 404, .. }));
    assert!(store.messages().await.is_empty());
}

#[tokio::test]
async fn test_request_of_other_kind_not_found() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (_, request) = seed_workflow(
        &store,
        WorkflowKind::ContentRequest,
        PetStatus::Available,
        RequestStatus::Pending,
    )
    .await;

    let err = apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Accept))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::RequestNotFound { .. }));
}

#[tokio::test]
async fn test_missing_pet_rolls_back_request_and_audit() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let request = store
        .seed_request(WorkflowKind::Adoption, 999, RequestStatus::Pending)
        .await;

    let err = apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Accept))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::PetNotFound { id: 999 }));
    assert!(store.messages().await.is_empty());
    let state = store
        .request_state(WorkflowKind::Adoption, request)
        .await
        .expect("request");
    assert_eq!(state.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_pet_update_fault_rolls_back_everything() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (pet, request) = seed_workflow(
        &store,
        WorkflowKind::ContentRequest,
        PetStatus::Available,
        RequestStatus::Pending,
    )
    .await;
    let (_, mut rx) = ws.subscribe();

    store.faults().fail_pet_update.store(true, Ordering::SeqCst);
    let err = apply_decision(&store, &ws, WorkflowKind::ContentRequest, request, &audit(Decision::Accept))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Storage(_)));
    assert!(store.messages().await.is_empty());
    assert_eq!(store.pet_status(pet).await, Some(PetStatus::Available));
    let state = store
        .request_state(WorkflowKind::ContentRequest, request)
        .await
        .expect("request");
    assert_eq!(state.status, RequestStatus::Pending);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_audit_fault_leaves_statuses() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (pet, request) = seed_workflow(
        &store,
        WorkflowKind::Adoption,
        PetStatus::Reserved,
        RequestStatus::Pending,
    )
    .await;

    store.faults().fail_message_insert.store(true, Ordering::SeqCst);
    assert!(
        apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Accept))
            .await
            .is_err()
    );
    assert_eq!(store.pet_status(pet).await, Some(PetStatus::Reserved));
}

#[tokio::test]
async fn test_committed_decision_is_broadcast() {
    let store = InMemoryStore::new();
    let ws = WsState::new(8);
    let (_, request) = seed_workflow(
        &store,
        WorkflowKind::Adoption,
        PetStatus::Available,
        RequestStatus::Pending,
    )
    .await;
    let (_, mut rx) = ws.subscribe();

    let message = apply_decision(&store, &ws, WorkflowKind::Adoption, request, &audit(Decision::Cancel))
        .await
        .expect("decision");

    let frame = rx.try_recv().expect("frame");
    let event: ChangeEvent = serde_json::from_str(&frame).expect("event");
    assert_eq!(event.event, "message-cancel");
    assert_eq!(event.data["id_message"], message.id_message);
    assert_eq!(event.data["status"], "cancel");
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any decision the request and the pet agree with the
    /// transition table, or nothing changed at all.
    #[test]
    fn prop_request_and_pet_stay_consistent(
        kind in arb_workflow_kind(),
        decision in arb_decision(),
        pet_status in arb_pet_status(),
        request_status in arb_request_status(),
    ) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let ws = WsState::new(8);
            let (pet, request) = seed_workflow(&store, kind, pet_status, request_status).await;

            let result = apply_decision(&store, &ws, kind, request, &audit(decision)).await;
            let target = kind.transition(decision);
            let state = store.request_state(kind, request).await;
            let current_pet = store.pet_status(pet).await;

            match result {
                Ok(message) => {
                    prop_assert_eq!(message.status.as_str(), decision.as_tag());
                    prop_assert_eq!(state.map(|s| s.status), Some(target.request_status));
                    prop_assert_eq!(current_pet, Some(target.pet_status));
                    prop_assert_eq!(store.messages().await.len(), 1);
                }
                Err(WorkflowError::AlreadyApplied { .. }) => {
                    prop_assert_eq!(request_status, target.request_status);
                    prop_assert_eq!(current_pet, Some(pet_status));
                    prop_assert!(store.messages().await.is_empty());
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
            Ok(())
        })?;
    }

    /// Accept followed by cancel always hands the pet back.
    #[test]
    fn prop_cancel_undoes_accept(kind in arb_workflow_kind()) {
        runtime().block_on(async {
            let store = InMemoryStore::new();
            let ws = WsState::new(8);
            let (pet, request) =
                seed_workflow(&store, kind, PetStatus::Available, RequestStatus::Pending).await;

            let accepted = apply_decision(&store, &ws, kind, request, &audit(Decision::Accept)).await;
            prop_assert!(accepted.is_ok());
            let cancelled = apply_decision(&store, &ws, kind, request, &audit(Decision::Cancel)).await;
            prop_assert!(cancelled.is_ok());

            prop_assert_eq!(store.pet_status(pet).await, Some(PetStatus::Available));
            prop_assert_eq!(store.messages().await.len(), 2);
            Ok(())
        })?;
    }
}
