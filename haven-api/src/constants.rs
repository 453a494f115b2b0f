//! Constants for Haven API
//!
//! Centralizing constants makes them easy to find, modify, and test.

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// UPLOADS
// ============================================================================

/// Default per-file upload limit (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Most image files accepted in one multipart request
pub const MAX_FILES_PER_REQUEST: usize = 10;

// ============================================================================
// OBJECT STORAGE
// ============================================================================

pub const DEFAULT_S3_ENDPOINT: &str = "https://storage.yandexcloud.net";

pub const DEFAULT_S3_REGION: &str = "ru-central1";

pub const DEFAULT_S3_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// BROADCASTER
// ============================================================================

/// Default outbound queue length per WebSocket subscriber
pub const DEFAULT_WS_CAPACITY: usize = 256;

// ============================================================================
// RESPONSE MESSAGES
// ============================================================================

pub const MSG_FETCHED: &str = "Data fetched";
pub const MSG_CREATED: &str = "Created";
pub const MSG_UPDATED: &str = "Updated";
pub const MSG_DELETED: &str = "Deleted";
pub const MSG_NO_DATA: &str = "No data found";
pub const MSG_DECISION_APPLIED: &str = "Decision applied";

// ============================================================================
// ROLES
// ============================================================================

/// System roles hidden from user administration lists.
pub const SYSTEM_ROLE_IDS: [i32; 3] = [1, 2, 6];

/// Role of shelter administrators, managed by the user who created them.
pub const ADMIN_ROLE_ID: i32 = 2;
