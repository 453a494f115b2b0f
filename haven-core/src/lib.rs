//! Haven Core - Entity Types
//!
//! Pure data structures shared by every Haven crate: record identifiers,
//! status code domains, entity rows, attachment ownership, the structured
//! search predicate and the error taxonomy. Nothing in here performs I/O.

use chrono::{DateTime, NaiveDate, Utc};

pub mod address;
pub mod attachment;
pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Primary key of every relational row (serial integer columns).
pub type RecordId = i32;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Calendar date, used for expiry dates and vaccination/examination dates.
pub type Date = NaiveDate;

/// Today's date in the server's local calendar.
pub fn today() -> Date {
    chrono::Local::now().date_naive()
}

pub use address::normalize_address;
pub use attachment::{Attachment, AttachmentOwner};
pub use entities::*;
pub use enums::{Decision, PetStatus, RequestStatus, Transition, WorkflowKind};
pub use error::{
    AttachmentError, HavenError, HavenResult, InventoryError, ObjectStoreError, StorageError,
    StorageResult, ValidationError, WorkflowError,
};
pub use filter::{CompiledPredicate, SearchFilter, SearchValue};
