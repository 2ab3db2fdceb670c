//! Remote store abstraction
//!
//! The durable source of truth is a relational backend with three tables
//! (`tasks`, `events`, `chat_history`), each keyed by row id and owner id.
//! [`RemoteStore`] is the untyped CRUD surface (select / insert / update /
//! delete with filters and ordering); [`StoreAdapter`] layers typed,
//! owner-scoped operations on top of it.
//!
//! Every operation on these tables must carry an equality filter on the owner
//! column. Implementations reject requests without one before doing any I/O.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::session::UserId;
use crate::utils::http::Retryable;

pub mod adapter;
pub mod memory;
pub mod rest;

pub use adapter::StoreAdapter;
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use rest::RestStore;

/// Column holding the owning user's id on every table
pub const OWNER_COLUMN: &str = "user_id";

/// A stored row: column name to JSON value
pub type Row = serde_json::Map<String, Value>;

/// Error types for remote store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Refusing unscoped access to {table}: missing owner filter")]
    MissingOwnerFilter { table: Table },

    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimit { retry_after: Option<u64> },

    #[error("Request failed: {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid store credentials: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot file error: {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::RateLimit { .. } => true,
            StoreError::Network(_) => true,
            StoreError::RequestFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            StoreError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// The three persisted tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Tasks,
    Events,
    ChatHistory,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Tasks, Table::Events, Table::ChatHistory];

    /// Table name on the backend
    pub fn name(&self) -> &'static str {
        match self {
            Table::Tasks => "tasks",
            Table::Events => "events",
            Table::ChatHistory => "chat_history",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    /// PostgREST operator keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
        }
    }
}

/// A single column predicate; multiple filters are AND-ed
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq<S: Into<String>, V: Into<Value>>(column: S, value: V) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte<S: Into<String>, V: Into<Value>>(column: S, value: V) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }

    pub fn lte<S: Into<String>, V: Into<Value>>(column: S, value: V) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lte,
            value: value.into(),
        }
    }

    /// Equality on the owner column
    pub fn owner(user: &UserId) -> Self {
        Self::eq(OWNER_COLUMN, user.as_str())
    }

    /// Whether `row` satisfies this predicate
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(&self.column) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }

    /// Value rendered for a query string
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Untyped CRUD surface of the relational backend
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Backend name for logging ("memory", "rest")
    fn backend_name(&self) -> &str;

    /// Rows of `table` matching all `filters`, optionally ordered
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Row>, StoreError>;

    /// Insert a row; the backend assigns `id` and `created_at` and echoes the stored row
    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;

    /// Apply `patch` to the row with `id` if it also matches `filters`
    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), StoreError>;

    /// Delete the row with `id` if it also matches `filters`
    async fn delete(&self, table: Table, id: &str, filters: &[Filter]) -> Result<(), StoreError>;
}

/// Reject requests that are not scoped to an owner
pub fn require_owner_filter(table: Table, filters: &[Filter]) -> Result<(), StoreError> {
    let scoped = filters
        .iter()
        .any(|f| f.column == OWNER_COLUMN && f.op == FilterOp::Eq && f.value.is_string());
    if scoped {
        Ok(())
    } else {
        Err(StoreError::MissingOwnerFilter { table })
    }
}

/// Reject inserts that do not name an owner
pub fn require_owner_column(table: Table, row: &Row) -> Result<(), StoreError> {
    match row.get(OWNER_COLUMN) {
        Some(Value::String(owner)) if !owner.is_empty() => Ok(()),
        _ => Err(StoreError::MissingOwnerFilter { table }),
    }
}

/// Canonical timestamp text; fixed width so text order equals time order
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Order two JSON scalars of the same kind
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
