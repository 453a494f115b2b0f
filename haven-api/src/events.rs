//! Change Events
//!
//! Every committed mutation is announced to live subscribers as a tagged
//! JSON frame `{"event": <tag>, "data": <payload>}`. Events are not
//! persisted and are never replayed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use haven_core::RecordId;

/// Kind of change a record went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

/// A tagged payload broadcast after a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event: String,
    pub data: JsonValue,
}

impl ChangeEvent {
    pub fn new(event: impl Into<String>, data: JsonValue) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Event carrying a serializable record.
    pub fn with_record<T: Serialize>(event: impl Into<String>, record: &T) -> Self {
        let event = event.into();
        let data = serde_json::to_value(record).unwrap_or_else(|e| {
            tracing::warn!(event = %event, error = %e, "Failed to serialize event payload");
            JsonValue::Null
        });
        Self { event, data }
    }

    /// Event for a record plus the image URLs attached by this change.
    /// The `images` field of the payload lists only the new URLs.
    pub fn with_attachments<T: Serialize>(
        event: impl Into<String>,
        record: &T,
        attached: &[String],
    ) -> Self {
        let mut change = Self::with_record(event, record);
        if let JsonValue::Object(map) = &mut change.data {
            map.insert("images".to_string(), json!(attached));
        }
        change
    }

    /// Event for a removed record.
    pub fn deleted(event: impl Into<String>, id: RecordId) -> Self {
        Self::new(event, json!({ "id": id }))
    }
}
