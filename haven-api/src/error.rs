//! Error Types for Haven API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversions from the domain error taxonomy in haven-core
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.
//! Internal failures are logged in full and reported with a generic message.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use haven_core::{
    AttachmentError, HavenError, InventoryError, ObjectStoreError, StorageError, ValidationError,
    WorkflowError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400, 413)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Stock used by the request is past its expiry date
    ExpiredStock,

    /// Uploaded file exceeds the configured size limit
    PayloadTooLarge,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity with the same unique key already exists
    EntityAlreadyExists,

    /// Operation conflicts with current state
    StateConflict,

    /// Not enough stock to satisfy the request
    InsufficientStock,

    // ========================================================================
    // Server Errors (500, 502, 503, 504)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Object storage rejected or failed the request
    ObjectStoreFailure,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::ExpiredStock => StatusCode::BAD_REQUEST,

            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists
            | ErrorCode::StateConflict
            | ErrorCode::InsufficientStock => StatusCode::CONFLICT,

            ErrorCode::ObjectStoreFailure => StatusCode::BAD_GATEWAY,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::ExpiredStock => "Stock has expired",
            ErrorCode::PayloadTooLarge => "Uploaded file is too large",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ObjectStoreFailure => "Object storage request failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// Serialized as `{code, message, details?}`. The `message` key matches the
/// success envelope so clients can always show `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    /// Create a generic not found error with custom message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    /// Create an EntityAlreadyExists error naming the clashing key.
    pub fn entity_already_exists(entity_type: &str, key: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} with the same {} already exists", entity_type, key),
        )
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn object_store_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ObjectStoreFailure, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code().map(|c| c.code()) == Some(UNIQUE_VIOLATION) {
            tracing::warn!("Unique constraint violated: {:?}", err);
            return ApiError::from_code(ErrorCode::EntityAlreadyExists);
        }

        tracing::error!("Database error: {:?}", err);

        // Return a generic database error to avoid leaking internal details
        ApiError::database_error("Database operation failed")
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);

        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON decode error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        tracing::debug!("Multipart error: {:?}", err);
        ApiError::invalid_input(format!("Invalid multipart body: {}", err.body_text()))
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => ApiError::entity_not_found(entity, id),
            StorageError::Conflict { entity, field } => {
                ApiError::entity_already_exists(entity, field)
            }
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::database_error("Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            ValidationError::InvalidIdentifier { column } => {
                // Identifiers come from code, never from callers.
                tracing::error!(column = %column, "Rejected search column identifier");
                ApiError::internal_error("Internal server error")
            }
            other => ApiError::validation_failed(other.to_string()),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NoSuchStock { .. }
            | InventoryError::RecordNotFound { .. }
            | InventoryError::StockNotFound { .. } => ApiError::not_found(err.to_string()),
            InventoryError::Expired { .. } => ApiError::new(ErrorCode::ExpiredStock, err.to_string()),
            InventoryError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            InventoryError::StockExists { .. } => {
                ApiError::new(ErrorCode::EntityAlreadyExists, err.to_string())
            }
            InventoryError::InvalidQuantity { .. } => ApiError::validation_failed(err.to_string()),
            InventoryError::Storage(inner) => inner.into(),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::RequestNotFound { .. } | WorkflowError::PetNotFound { .. } => {
                ApiError::not_found(err.to_string())
            }
            WorkflowError::AlreadyApplied { .. } => ApiError::state_conflict(err.to_string()),
            WorkflowError::Storage(inner) => inner.into(),
        }
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::InvalidUrl { .. } => ApiError::validation_failed(err.to_string()),
            ObjectStoreError::PayloadTooLarge { .. } => ApiError::payload_too_large(err.to_string()),
            other => {
                tracing::error!("Object store error: {}", other);
                ApiError::object_store_failure("Object storage request failed")
            }
        }
    }
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::UploadFailed {
                attached,
                requested,
                source,
            } => {
                tracing::error!(attached, requested, "Attachment upload failed: {}", source);
                ApiError::object_store_failure(format!(
                    "Attached {} of {} files before an upload failed",
                    attached, requested
                ))
                .with_details(serde_json::json!({
                    "attached": attached,
                    "requested": requested,
                }))
            }
            AttachmentError::Storage(inner) => inner.into(),
        }
    }
}

impl From<HavenError> for ApiError {
    fn from(err: HavenError) -> Self {
        match err {
            HavenError::Storage(e) => e.into(),
            HavenError::Inventory(e) => e.into(),
            HavenError::Workflow(e) => e.into(),
            HavenError::ObjectStore(e) => e.into(),
            HavenError::Attachment(e) => e.into(),
            HavenError::Validation(e) => e.into(),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::Date;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::EntityNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::EntityAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InsufficientStock.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ExpiredStock.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ObjectStoreFailure.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_constructors() {
        let err = ApiError::entity_not_found("Pets", 12);
        assert_eq!(err.code, ErrorCode::EntityNotFound);
        assert!(err.message.contains("Pets"));
        assert!(err.message.contains("12"));

        let err = ApiError::missing_field("nickname");
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("nickname"));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::state_conflict("already accepted");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("STATE_CONFLICT"));
        assert!(json.contains("already accepted"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_inventory_errors_map_to_distinct_codes() {
        let expired: ApiError = InventoryError::Expired {
            vaccine_id: 1,
            shelter_id: 2,
            expired_on: Date::from_ymd_opt(2020, 1, 1).unwrap(),
        }
        .into();
        assert_eq!(expired.code, ErrorCode::ExpiredStock);

        let short: ApiError = InventoryError::InsufficientStock {
            vaccine_id: 1,
            shelter_id: 2,
            requested: 3,
        }
        .into();
        assert_eq!(short.code, ErrorCode::InsufficientStock);

        let missing: ApiError = InventoryError::NoSuchStock {
            vaccine_id: 1,
            shelter_id: 2,
        }
        .into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_internals_are_not_leaked() {
        let err: ApiError = StorageError::Database {
            reason: "relation \"Pets\" does not exist".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("relation"));
    }

    #[test]
    fn test_partial_upload_reports_counts() {
        let err: ApiError = AttachmentError::UploadFailed {
            attached: 1,
            requested: 3,
            source: ObjectStoreError::Upload {
                name: "c.png".to_string(),
                reason: "timeout".to_string(),
            },
        }
        .into();
        assert_eq!(err.code, ErrorCode::ObjectStoreFailure);
        assert!(err.message.contains("1 of 3"));
        assert_eq!(
            err.details,
            Some(serde_json::json!({"attached": 1, "requested": 3}))
        );
    }

    #[test]
    fn test_already_applied_is_state_conflict() {
        let err: ApiError = WorkflowError::AlreadyApplied {
            kind: "AdoptionApp",
            id: 4,
            decision: "accept",
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::StateConflict);
    }
}
