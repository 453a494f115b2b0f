//! Component trait for generic CRUD operations.
//!
//! Every record kind (pets, shelters, funds, ...) shares the same database
//! operations. Each kind implements [`Listable`] to describe its table and
//! key columns, and [`Component`] to describe its insertable columns and
//! broadcast tags. `DbClient` implements `create`, `get`, `update` and
//! `list` once over these traits; deletes run through the record service.
//!
//! Stock and ledger rows are only [`Listable`]: they change exclusively
//! through the inventory service.

use haven_core::{AttachmentOwner, Date, PetStatus, RecordId, RequestStatus, SearchValue};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ApiError, ApiResult};
use crate::events::ChangeAction;

// ============================================================================
// COMPONENT TRAIT
// ============================================================================

/// Record kinds readable through the generic `get` and `list` operations.
pub trait Listable: Sized + Send + Sync + Clone + DeserializeOwned + Serialize + 'static {
    /// Human-readable entity name used in errors and logs.
    const ENTITY_NAME: &'static str;

    /// Quoted table name.
    const TABLE: &'static str;

    /// Primary key column.
    const PK_FIELD: &'static str;

    /// Columns matched by the free-text search of list endpoints.
    const SEARCH_FIELDS: &'static [&'static str] = &[];

    /// Column list results are ordered by.
    const ORDER_FIELD: Option<&'static str> = None;

    /// Child image table, for kinds that carry attachments.
    const ATTACHMENTS: Option<AttachmentOwner> = None;

    fn from_json(json: JsonValue) -> ApiResult<Self> {
        serde_json::from_value(json).map_err(|e| {
            tracing::error!(entity = Self::ENTITY_NAME, error = %e, "Failed to decode row");
            ApiError::internal_error(format!("Failed to parse {}", Self::ENTITY_NAME))
        })
    }
}

/// Record kinds that are also created and updated through the generic
/// `create` and `update` operations.
pub trait Component: Listable {
    /// Request body for creating a record.
    type Create: DeserializeOwned + Send + Sync;

    /// Request body for a partial update.
    type Update: DeserializeOwned + Send + Sync;

    /// Prefix of the broadcast tags (`<prefix>-add`, `<prefix>-update`, ...).
    const EVENT_PREFIX: &'static str;

    fn entity_id(&self) -> RecordId;

    /// Every insertable column with its value.
    fn create_columns(req: &Self::Create) -> ApiResult<Columns>;

    /// Only the columns present in the request.
    fn update_columns(req: &Self::Update) -> ApiResult<Columns>;

    /// Unique keys a new row must not collide with.
    fn create_unique_keys(_req: &Self::Create) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Unique keys touched by an update. A key is only checked when every
    /// one of its columns is present in the request.
    fn update_unique_keys(_req: &Self::Update) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Broadcast tag for a committed change.
    fn event_name(action: ChangeAction) -> String {
        format!("{}-{}", Self::EVENT_PREFIX, action.as_str())
    }
}

// ============================================================================
// SQL PARAMETER TYPE
// ============================================================================

/// Type-erased SQL parameter for generic CRUD operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i32),
    OptInt(Option<i32>),
    String(String),
    OptString(Option<String>),
    Date(Date),
    OptDate(Option<Date>),
    IntList(Vec<i32>),
}

impl SqlParam {
    /// Convert this SqlParam to a reference usable with tokio_postgres.
    pub fn as_to_sql(&self) -> &(dyn tokio_postgres::types::ToSql + Sync) {
        match self {
            SqlParam::Int(v) => v,
            SqlParam::OptInt(v) => v,
            SqlParam::String(v) => v,
            SqlParam::OptString(v) => v,
            SqlParam::Date(v) => v,
            SqlParam::OptDate(v) => v,
            SqlParam::IntList(v) => v,
        }
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v)
    }
}

impl From<Option<i32>> for SqlParam {
    fn from(v: Option<i32>) -> Self {
        SqlParam::OptInt(v)
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::String(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::String(v.to_string())
    }
}

impl From<Option<String>> for SqlParam {
    fn from(v: Option<String>) -> Self {
        SqlParam::OptString(v)
    }
}

impl From<Date> for SqlParam {
    fn from(v: Date) -> Self {
        SqlParam::Date(v)
    }
}

impl From<Option<Date>> for SqlParam {
    fn from(v: Option<Date>) -> Self {
        SqlParam::OptDate(v)
    }
}

impl From<PetStatus> for SqlParam {
    fn from(v: PetStatus) -> Self {
        SqlParam::Int(v.code())
    }
}

impl From<RequestStatus> for SqlParam {
    fn from(v: RequestStatus) -> Self {
        SqlParam::Int(v.code())
    }
}

impl From<SearchValue> for SqlParam {
    fn from(v: SearchValue) -> Self {
        match v {
            SearchValue::Int(i) => SqlParam::Int(i),
            SearchValue::Text(t) => SqlParam::String(t),
            SearchValue::IntList(l) => SqlParam::IntList(l),
        }
    }
}

// ============================================================================
// COLUMN LISTS
// ============================================================================

/// Ordered `(column, value)` pairs for an INSERT or UPDATE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns(Vec<(&'static str, SqlParam)>);

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<SqlParam>) -> Self {
        self.0.push((column, value.into()));
        self
    }

    /// Add the column only when a value is present.
    pub fn set_some<T: Into<SqlParam>>(mut self, column: &'static str, value: Option<T>) -> Self {
        if let Some(v) = value {
            self.0.push((column, v.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(name, _)| *name)
    }

    pub fn params(&self) -> impl Iterator<Item = &SqlParam> {
        self.0.iter().map(|(_, value)| value)
    }

    pub fn get(&self, column: &str) -> Option<&SqlParam> {
        self.0
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// A set of columns whose combined values must be unique in the table.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey {
    /// Label used in the conflict message.
    pub label: &'static str,
    pub columns: Vec<(&'static str, SqlParam)>,
}

impl UniqueKey {
    pub fn single(column: &'static str, value: impl Into<SqlParam>) -> Self {
        Self {
            label: column,
            columns: vec![(column, value.into())],
        }
    }

    /// `label` unique within the scope column.
    pub fn scoped(
        label: &'static str,
        value: impl Into<SqlParam>,
        scope: &'static str,
        scope_value: impl Into<SqlParam>,
    ) -> Self {
        Self {
            label,
            columns: vec![(label, value.into()), (scope, scope_value.into())],
        }
    }

    /// Build a key only when every part is present.
    pub fn scoped_opt<A: Into<SqlParam>, B: Into<SqlParam>>(
        label: &'static str,
        value: Option<A>,
        scope: &'static str,
        scope_value: Option<B>,
    ) -> Option<Self> {
        Some(Self::scoped(label, value?, scope, scope_value?))
    }
}

/// Reject blank required text.
pub fn require_text(field: &'static str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        Err(ApiError::missing_field(field))
    } else {
        Ok(())
    }
}
