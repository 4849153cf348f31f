//! Error types for the sync core

use crate::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error("Local store error: {0}")]
    Store(#[from] local_store::StoreError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Remote unavailable and no cached data for entity: {0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, OfflineError>;
