//! Schema creation and versioned, additive migrations
//!
//! The schema version lives in SQLite's `user_version` pragma. Migrations
//! only ever add tables, indexes, or optional columns so that operations
//! queued by an older build remain readable after an application update.

use crate::{Result, StoreError};
use sqlx::SqlitePool;

/// Current schema generation.
pub(crate) const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS operations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        op_type TEXT NOT NULL,
        entity TEXT NOT NULL,
        data TEXT NOT NULL,
        original_id TEXT,
        timestamp INTEGER NOT NULL,
        status TEXT NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0,
        error_message TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_operations_status ON operations(status)",
    "CREATE INDEX IF NOT EXISTS idx_operations_timestamp ON operations(timestamp)",
    "CREATE TABLE IF NOT EXISTS cached_entities (
        entity TEXT NOT NULL,
        original_id TEXT NOT NULL,
        data TEXT NOT NULL,
        last_sync INTEGER NOT NULL,
        version INTEGER NOT NULL DEFAULT 1,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (entity, original_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_cached_entities_entity ON cached_entities(entity)",
];

/// Bring the database up to the current schema version.
pub(crate) async fn migrate(pool: &SqlitePool) -> Result<()> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if current > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    if current < 1 {
        for statement in MIGRATION_V1 {
            sqlx::query(statement).execute(pool).await?;
        }
    }

    if current < SCHEMA_VERSION {
        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(pool)
            .await?;
        tracing::info!(from = current, to = SCHEMA_VERSION, "migrated local store schema");
    }

    Ok(())
}
