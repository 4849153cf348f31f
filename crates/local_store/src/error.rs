//! Error types for local store operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
