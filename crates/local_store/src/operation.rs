//! Queued operation model and lifecycle states

use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Kind of deferred write held in the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Insert a new record into the remote collection.
    Create,
    /// Overwrite an existing remote record, keyed by its primary key.
    Update,
    /// Delete an existing remote record, keyed by its primary key.
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "CREATE",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "CREATE" => Ok(OperationType::Create),
            "UPDATE" => Ok(OperationType::Update),
            "DELETE" => Ok(OperationType::Delete),
            other => Err(StoreError::Corrupt(format!(
                "unknown operation type: {other}"
            ))),
        }
    }
}

/// Lifecycle state of a queued operation.
///
/// Created as `Pending`, picked up by a sync pass as `Syncing`, then either
/// `Completed` (purged by cleanup) or `Failed` (retried on the next pass).
/// `Abandoned` is terminal: the operation exceeded the retry cap and is no
/// longer replayed until the user intervenes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Syncing,
    Completed,
    Failed,
    Abandoned,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::Syncing => "SYNCING",
            OperationStatus::Completed => "COMPLETED",
            OperationStatus::Failed => "FAILED",
            OperationStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OperationStatus::Pending),
            "SYNCING" => Ok(OperationStatus::Syncing),
            "COMPLETED" => Ok(OperationStatus::Completed),
            "FAILED" => Ok(OperationStatus::Failed),
            "ABANDONED" => Ok(OperationStatus::Abandoned),
            other => Err(StoreError::Corrupt(format!(
                "unknown operation status: {other}"
            ))),
        }
    }

    /// Whether the operation still needs a replay attempt.
    pub fn is_replayable(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::Failed)
    }
}

/// A queued, not-yet-confirmed write awaiting remote application.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    /// Locally assigned, monotonically increasing identifier.
    pub id: i64,
    pub op_type: OperationType,
    /// Logical entity name the operation targets (registry key).
    pub entity: String,
    /// Payload to write. Full record for create/update, null for delete.
    pub data: Value,
    /// Remote-side primary key. Required for update/delete, absent for create.
    pub original_id: Option<String>,
    /// Creation time in Unix milliseconds; replay order follows this.
    pub timestamp: i64,
    pub status: OperationStatus,
    /// Count of failed sync attempts.
    pub retry_count: u32,
    /// Error message recorded by the most recent failed attempt.
    pub error_message: Option<String>,
}

/// Fields supplied by the caller when enqueuing; the store assigns the
/// rest (id, timestamp, status, retry count).
#[derive(Clone, Debug)]
pub struct OperationDraft {
    pub op_type: OperationType,
    pub entity: String,
    pub data: Value,
    pub original_id: Option<String>,
}

/// Raw database row, converted into the typed [`Operation`].
#[derive(FromRow)]
pub(crate) struct OperationRow {
    pub id: i64,
    pub op_type: String,
    pub entity: String,
    pub data: String,
    pub original_id: Option<String>,
    pub timestamp: i64,
    pub status: String,
    pub retry_count: i64,
    pub error_message: Option<String>,
}

impl TryFrom<OperationRow> for Operation {
    type Error = StoreError;

    fn try_from(row: OperationRow) -> Result<Self> {
        Ok(Operation {
            id: row.id,
            op_type: OperationType::parse(&row.op_type)?,
            entity: row.entity,
            data: serde_json::from_str(&row.data)?,
            original_id: row.original_id,
            timestamp: row.timestamp,
            status: OperationStatus::parse(&row.status)?,
            retry_count: row.retry_count as u32,
            error_message: row.error_message,
        })
    }
}
