use thiserror::Error;

/// Errors from the keyword index adapters.
#[derive(Debug, Error)]
pub enum SparseIndexError {
    #[error("keyword store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("failed to encode index export: {0}")]
    Export(#[from] serde_json::Error),
}
