//! Error types for Haven operations

use crate::{Date, RecordId};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("{entity} with the same {field} already exists")]
    Conflict { entity: &'static str, field: String },

    #[error("Database error: {reason}")]
    Database { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Row decode failed for {entity}: {reason}")]
    Decode { entity: &'static str, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Inventory (vaccine stock) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("No stock of vaccine {vaccine_id} at shelter {shelter_id}")]
    NoSuchStock {
        vaccine_id: RecordId,
        shelter_id: RecordId,
    },

    #[error("Vaccine {vaccine_id} at shelter {shelter_id} expired on {expired_on}")]
    Expired {
        vaccine_id: RecordId,
        shelter_id: RecordId,
        expired_on: Date,
    },

    #[error("Insufficient stock of vaccine {vaccine_id} at shelter {shelter_id} for {requested} doses")]
    InsufficientStock {
        vaccine_id: RecordId,
        shelter_id: RecordId,
        requested: i32,
    },

    #[error("Vaccination record {id} not found")]
    RecordNotFound { id: RecordId },

    #[error("Stock entry {id} not found")]
    StockNotFound { id: RecordId },

    #[error("Vaccine {vaccine_id} is already stocked at shelter {shelter_id}")]
    StockExists {
        vaccine_id: RecordId,
        shelter_id: RecordId,
    },

    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i32 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl InventoryError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            InventoryError::NoSuchStock { .. } => "no_stock",
            InventoryError::Expired { .. } => "expired",
            InventoryError::InsufficientStock { .. } => "insufficient",
            InventoryError::RecordNotFound { .. } => "record_not_found",
            InventoryError::StockNotFound { .. } => "stock_not_found",
            InventoryError::StockExists { .. } => "stock_exists",
            InventoryError::InvalidQuantity { .. } => "invalid_quantity",
            InventoryError::Storage(_) => "storage",
        }
    }
}

/// Workflow (adoption / content request) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{kind} {id} not found")]
    RequestNotFound { kind: &'static str, id: RecordId },

    #[error("Pet {id} linked to the request not found")]
    PetNotFound { id: RecordId },

    #[error("{kind} {id} has already received decision '{decision}'")]
    AlreadyApplied {
        kind: &'static str,
        id: RecordId,
        decision: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            WorkflowError::RequestNotFound { .. } => "request_not_found",
            WorkflowError::PetNotFound { .. } => "pet_not_found",
            WorkflowError::AlreadyApplied { .. } => "already_applied",
            WorkflowError::Storage(_) => "storage",
        }
    }
}

/// Object store gateway errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObjectStoreError {
    #[error("Invalid storage URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Upload of '{name}' failed: {reason}")]
    Upload { name: String, reason: String },

    #[error("Delete of '{url}' failed: {reason}")]
    Delete { url: String, reason: String },

    #[error("File '{name}' is {size} bytes, limit is {limit}")]
    PayloadTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("Object store is not configured: {reason}")]
    NotConfigured { reason: String },
}

/// Attachment synchronization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Attached {attached} of {requested} files before upload failed: {source}")]
    UploadFailed {
        attached: usize,
        requested: usize,
        source: ObjectStoreError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid column identifier: {column}")]
    InvalidIdentifier { column: String },
}

/// Master error type for all Haven errors.
#[derive(Debug, Clone, Error)]
pub enum HavenError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for Haven operations.
pub type HavenResult<T> = Result<T, HavenError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity: "Pet",
            id: 42,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Pet"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_inventory_error_display_expired() {
        let err = InventoryError::Expired {
            vaccine_id: 3,
            shelter_id: 9,
            expired_on: Date::from_ymd_opt(2024, 1, 31).unwrap_or_default(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expired"));
        assert!(msg.contains("2024-01-31"));
    }

    #[test]
    fn test_attachment_error_reports_progress() {
        let err = AttachmentError::UploadFailed {
            attached: 2,
            requested: 3,
            source: ObjectStoreError::Upload {
                name: "cat.png".to_string(),
                reason: "connection reset".to_string(),
            },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2 of 3"));
        assert!(msg.contains("cat.png"));
    }

    #[test]
    fn test_reason_labels() {
        let err = InventoryError::InsufficientStock {
            vaccine_id: 1,
            shelter_id: 1,
            requested: 4,
        };
        assert_eq!(err.reason(), "insufficient");
        let err = WorkflowError::AlreadyApplied {
            kind: "AdoptionApp",
            id: 3,
            decision: "accept",
        };
        assert_eq!(err.reason(), "already_applied");
    }

    #[test]
    fn test_haven_error_from_inventory() {
        let err: HavenError = InventoryError::InvalidQuantity { quantity: 0 }.into();
        assert!(matches!(err, HavenError::Inventory(_)));
        assert!(format!("{}", err).contains("Quantity must be positive"));
    }
}
