use thiserror::Error;

/// Errors from the ingest pipeline.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to segment file: {0}")]
    Segment(#[from] ragcode_code_chunker::ChunkerError),

    #[error("failed to generate batch embeddings: {0}")]
    Embedding(#[from] ragcode_embeddings::EmbeddingError),

    #[error("failed to store chunk batch after {attempts} attempts: {message}")]
    Store { attempts: usize, message: String },

    #[error("{0}")]
    Validation(#[from] ragcode_domain::DomainError),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}
