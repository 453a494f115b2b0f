//! Service Layer
//!
//! The multi-statement operations of the backend. Each service is written
//! against the storage seams so the same code runs on the PostgreSQL client
//! and on the in-memory store. Broadcasts happen only after a commit.

mod attachment_service;
mod decision_service;
mod inventory_service;
mod record_service;

pub use attachment_service::*;
pub use decision_service::*;
pub use inventory_service::*;
pub use record_service::*;

use haven_storage::Transaction;

/// Roll back after a failed step. The original error is what the caller
/// sees, so a failing rollback is only logged.
async fn abort<T: Transaction>(tx: T, operation: &'static str) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(operation, error = %e, "Rollback failed");
    }
}
