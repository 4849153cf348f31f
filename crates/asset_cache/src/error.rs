//! Error types for the asset cache

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetCacheError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No cached response for: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, AssetCacheError>;
