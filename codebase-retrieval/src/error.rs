use thiserror::Error;

/// Errors surfaced by the retrieval pipeline.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding the query failed; fatal to the request
    #[error("failed to embed query: {0}")]
    Embedding(#[from] ragcode_embeddings::EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] ragcode_vector_store::VectorStoreError),

    #[error("keyword index error: {0}")]
    Keyword(#[from] ragcode_sparse_index::SparseIndexError),

    #[error("invalid retrieval configuration: {0}")]
    InvalidConfig(String),
}
