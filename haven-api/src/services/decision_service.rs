//! Decision Service
//!
//! Accepting or cancelling a workflow request. The audit message, the
//! request status and the pet status are written in one transaction, so a
//! request never points at a status its pet disagrees with.

use haven_core::{Message, NewMessage, RecordId, WorkflowError, WorkflowKind};
use haven_storage::{Transaction, TransactionalStore, WorkflowTx};
use tracing::info;

use crate::events::ChangeEvent;
use crate::telemetry::METRICS;
use crate::ws::WsState;

use super::abort;

/// Apply `audit.decision` to the request `request_id` of the given kind.
///
/// # Errors
/// - `RequestNotFound` when the request does not exist.
/// - `AlreadyApplied` when the request is already in the decision's target
///   status. Nothing is written in that case.
/// - `PetNotFound` when the linked pet row is gone; every write is rolled back.
pub async fn apply_decision<S: TransactionalStore>(
    store: &S,
    ws: &WsState,
    kind: WorkflowKind,
    request_id: RecordId,
    audit: &NewMessage,
) -> Result<Message, WorkflowError> {
    let result = commit_decision(store, kind, request_id, audit).await;
    record_outcome(kind, audit, &result);
    let message = result?;

    info!(
        request_kind = kind.entity_name(),
        request_id,
        decision = audit.decision.as_tag(),
        "Decision applied"
    );
    ws.publish(&ChangeEvent::with_record(audit.decision.event_tag(), &message));
    Ok(message)
}

async fn commit_decision<S: TransactionalStore>(
    store: &S,
    kind: WorkflowKind,
    request_id: RecordId,
    audit: &NewMessage,
) -> Result<Message, WorkflowError> {
    let mut tx = store.begin().await?;
    let message = match transition(&mut tx, kind, request_id, audit).await {
        Ok(message) => message,
        Err(e) => {
            abort(tx, "apply_decision").await;
            return Err(e);
        }
    };
    tx.commit().await?;
    Ok(message)
}

fn record_outcome(kind: WorkflowKind, audit: &NewMessage, result: &Result<Message, WorkflowError>) {
    if let Ok(metrics) = METRICS.as_ref() {
        let outcome = match result {
            Ok(_) => "applied",
            Err(e) => e.reason(),
        };
        metrics.record_decision(kind.entity_name(), audit.decision.as_tag(), outcome);
    }
}

async fn transition<T: WorkflowTx>(
    tx: &mut T,
    kind: WorkflowKind,
    request_id: RecordId,
    audit: &NewMessage,
) -> Result<Message, WorkflowError> {
    let current = tx
        .request_for_update(kind, request_id)
        .await?
        .ok_or(WorkflowError::RequestNotFound {
            kind: kind.entity_name(),
            id: request_id,
        })?;

    let target = kind.transition(audit.decision);
    if current.status == target.request_status {
        return Err(WorkflowError::AlreadyApplied {
            kind: kind.entity_name(),
            id: request_id,
            decision: audit.decision.as_tag(),
        });
    }

    let message = tx.message_insert(audit).await?;

    if !tx
        .request_set_status(kind, request_id, target.request_status)
        .await?
    {
        return Err(WorkflowError::RequestNotFound {
            kind: kind.entity_name(),
            id: request_id,
        });
    }

    if !tx.pet_set_status(current.pets_id, target.pet_status).await? {
        return Err(WorkflowError::PetNotFound {
            id: current.pets_id,
        });
    }

    Ok(message)
}
