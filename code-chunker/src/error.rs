use thiserror::Error;

/// Errors produced while segmenting or chunking a file.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// The syntax-tree parser rejected the source
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },

    /// Invalid chunker configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
