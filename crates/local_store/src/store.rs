//! The durable local store
//!
//! Wraps an embedded SQLite database holding the operation queue and the
//! cached-entity snapshot. Constructed explicitly with an `open`/`close`
//! lifecycle and injected into its consumers, so each can be tested in
//! isolation against an in-memory instance.

use crate::operation::OperationRow;
use crate::schema;
use crate::{CachedEntity, CachedEntityRow, Operation, OperationDraft, OperationStatus, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Durable store for queued operations and cached entities.
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if necessary) a store backed by a database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        schema::migrate(&pool).await?;

        let store = Self { pool };
        store.recover_interrupted_operations().await?;

        tracing::debug!(path = %path.as_ref().display(), "opened local store");
        Ok(store)
    }

    /// Open an in-memory store. State is lost when the store is closed.
    pub async fn open_in_memory() -> Result<Self> {
        // A single connection keeps the in-memory database alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        schema::migrate(&pool).await?;

        let store = Self { pool };
        store.recover_interrupted_operations().await?;
        Ok(store)
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========== Operation queue ==========

    /// Persist a new operation. Inserted as `Pending` with zero retries and
    /// a store-assigned timestamp; returns the assigned id.
    pub async fn add_operation(&self, draft: OperationDraft) -> Result<i64> {
        let data = serde_json::to_string(&draft.data)?;
        let timestamp = Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO operations (op_type, entity, data, original_id, timestamp, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(draft.op_type.as_str())
        .bind(&draft.entity)
        .bind(&data)
        .bind(&draft.original_id)
        .bind(timestamp)
        .bind(OperationStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(id, op_type = draft.op_type.as_str(), entity = %draft.entity, "queued operation");
        Ok(id)
    }

    /// All operations still awaiting a successful replay (`Pending` or
    /// `Failed`), in insertion order.
    pub async fn pending_operations(&self) -> Result<Vec<Operation>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            "SELECT * FROM operations
             WHERE status IN ('PENDING', 'FAILED')
             ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Operation::try_from).collect()
    }

    /// Look up a single operation by id.
    pub async fn operation(&self, id: i64) -> Result<Option<Operation>> {
        let row = sqlx::query_as::<_, OperationRow>("SELECT * FROM operations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Operation::try_from).transpose()
    }

    /// Record a status transition. A transition to `Failed` also increments
    /// the retry count and stores the error message; other transitions
    /// update the status only.
    pub async fn update_operation_status(
        &self,
        id: i64,
        status: OperationStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        if status == OperationStatus::Failed {
            sqlx::query(
                "UPDATE operations
                 SET status = ?1, retry_count = retry_count + 1, error_message = ?2
                 WHERE id = ?3",
            )
            .bind(status.as_str())
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE operations SET status = ?1 WHERE id = ?2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Delete every operation that reached `Completed`. Returns the number
    /// of rows purged.
    pub async fn clear_completed_operations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM operations WHERE status = 'COMPLETED'")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete every operation regardless of status. User-initiated escape
    /// hatch; the caller owns any confirmation step.
    pub async fn clear_all_operations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM operations")
            .execute(&self.pool)
            .await?;

        tracing::info!(cleared = result.rows_affected(), "cleared operation queue");
        Ok(result.rows_affected())
    }

    /// Count of operations still awaiting replay.
    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM operations WHERE status IN ('PENDING', 'FAILED')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Operations whose most recent replay attempt failed, for distinct
    /// display alongside the error message.
    pub async fn failed_operations(&self) -> Result<Vec<Operation>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            "SELECT * FROM operations WHERE status = 'FAILED' ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Operation::try_from).collect()
    }

    /// Operations that exceeded the retry cap, for distinct display.
    pub async fn abandoned_operations(&self) -> Result<Vec<Operation>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            "SELECT * FROM operations WHERE status = 'ABANDONED' ORDER BY timestamp ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Operation::try_from).collect()
    }

    /// Reset operations stranded as `Syncing` by an interrupted pass back to
    /// `Pending` so the next pass picks them up again.
    async fn recover_interrupted_operations(&self) -> Result<()> {
        let result = sqlx::query("UPDATE operations SET status = 'PENDING' WHERE status = 'SYNCING'")
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::warn!(
                recovered = result.rows_affected(),
                "reset interrupted operations to pending"
            );
        }
        Ok(())
    }

    // ========== Cached entities ==========

    /// Upsert a cached snapshot. An existing `(entity, original_id)` row is
    /// overwritten with a bumped version and refreshed sync time; a new row
    /// starts at version 1.
    pub async fn cache_data(&self, entity: &str, original_id: &str, data: &Value) -> Result<()> {
        let body = serde_json::to_string(data)?;
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            "INSERT INTO cached_entities (entity, original_id, data, last_sync, version, is_deleted)
             VALUES (?1, ?2, ?3, ?4, 1, 0)
             ON CONFLICT(entity, original_id) DO UPDATE SET
                 data = excluded.data,
                 last_sync = excluded.last_sync,
                 version = version + 1,
                 is_deleted = 0",
        )
        .bind(entity)
        .bind(original_id)
        .bind(&body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All non-deleted cached snapshots for an entity.
    pub async fn cached_data(&self, entity: &str) -> Result<Vec<CachedEntity>> {
        let rows = sqlx::query_as::<_, CachedEntityRow>(
            "SELECT * FROM cached_entities
             WHERE entity = ?1 AND is_deleted = 0
             ORDER BY original_id ASC",
        )
        .bind(entity)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CachedEntity::try_from).collect()
    }

    /// Soft-delete a cached snapshot so offline reads stop returning it.
    pub async fn mark_cache_deleted(&self, entity: &str, original_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE cached_entities SET is_deleted = 1
             WHERE entity = ?1 AND original_id = ?2",
        )
        .bind(entity)
        .bind(original_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Timestamp of the most recent cache refresh for an entity, if any.
    pub async fn last_sync(&self, entity: &str) -> Result<Option<i64>> {
        let last: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(last_sync) FROM cached_entities WHERE entity = ?1",
        )
        .bind(entity)
        .fetch_one(&self.pool)
        .await?;

        Ok(last)
    }
}
