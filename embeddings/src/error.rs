use thiserror::Error;

/// Errors from the embedding service.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("embedding worker failed on index {index}: {message}")]
    Batch { index: usize, message: String },
}
