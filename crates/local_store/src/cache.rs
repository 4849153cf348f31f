//! Cached entity model for offline reads

use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A locally stored snapshot of a remote record.
///
/// At most one cached entity exists per `(entity, original_id)` pair;
/// writes are upserts keyed by that identity. Records carrying the
/// soft-delete flag are excluded from cached reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedEntity {
    /// Logical entity name, mirroring the remote collection.
    pub entity: String,
    /// Remote-side primary key of the snapshotted record.
    pub original_id: String,
    /// Last-known full record body as returned by the remote store.
    pub data: Value,
    /// Unix milliseconds of the most recent successful refresh.
    pub last_sync: i64,
    /// Incremented on every upsert of the same identity.
    pub version: i64,
    /// Soft-delete marker set when a queued delete targets this record.
    pub is_deleted: bool,
}

/// Raw database row, converted into the typed [`CachedEntity`].
#[derive(FromRow)]
pub(crate) struct CachedEntityRow {
    pub entity: String,
    pub original_id: String,
    pub data: String,
    pub last_sync: i64,
    pub version: i64,
    pub is_deleted: i64,
}

impl TryFrom<CachedEntityRow> for CachedEntity {
    type Error = StoreError;

    fn try_from(row: CachedEntityRow) -> Result<Self> {
        Ok(CachedEntity {
            entity: row.entity,
            original_id: row.original_id,
            data: serde_json::from_str(&row.data)?,
            last_sync: row.last_sync,
            version: row.version,
            is_deleted: row.is_deleted != 0,
        })
    }
}
