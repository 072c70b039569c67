use thiserror::Error;

/// Errors from the vector store adapters.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store initialization failed: {0}")]
    Initialization(String),

    #[error("failed to store chunks: {0}")]
    Store(String),

    #[error("failed to delete chunks: {0}")]
    Delete(String),

    #[error("vector search failed: {0}")]
    Search(String),

    #[error("chunk not found: {0}")]
    NotFound(String),
}
