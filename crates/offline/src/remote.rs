//! Remote table boundary
//!
//! The backend is consumed through this trait only: given a table name and
//! a record, perform a mutation or a keyed read that returns success or a
//! structured failure. Authentication is attached by the implementation,
//! transparently to the core.
//!
//! Failures are a typed result rather than a thrown exception so the queue
//! manager's "every failure is retried the same way" policy is an explicit
//! decision at this boundary.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Rows fetched per page when the read path enumerates large result sets.
pub const SELECT_PAGE_SIZE: usize = 1000;

/// Structured failure from the remote store.
///
/// The queue manager deliberately does not distinguish these when deciding
/// to retry; the split exists for logging and display.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network unreachable or request timed out.
    #[error("connectivity failure: {0}")]
    Connectivity(String),
    /// The backend refused the request (validation, constraint,
    /// authorization).
    #[error("remote rejection: {0}")]
    Rejected(String),
}

/// Equality predicate applied server-side on reads.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Sort key applied server-side on reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Offset/limit window for paginated reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Abstract remote collection API.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Insert a record, returning the stored record (with server-assigned
    /// fields).
    async fn insert(&self, table: &str, record: &Value) -> Result<Value, RemoteError>;

    /// Update the record whose `key_column` equals `key`, returning the
    /// stored record.
    async fn update(
        &self,
        table: &str,
        record: &Value,
        key_column: &str,
        key: &str,
    ) -> Result<Value, RemoteError>;

    /// Delete the record whose `key_column` equals `key`.
    async fn delete(&self, table: &str, key_column: &str, key: &str) -> Result<(), RemoteError>;

    /// Read one page of records with equality filters and an optional sort
    /// applied server-side.
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
        page: Page,
    ) -> Result<Vec<Value>, RemoteError>;
}
