//! Text embedding generation for code chunks.
//!
//! The core only depends on the [`Embedder`] capability; [`OllamaEmbedder`]
//! is the HTTP adapter. Batch requests run through a bounded worker pool and
//! a process-wide semaphore so bursts of files cannot overwhelm the service.

mod error;
mod service;

pub use error::EmbeddingError;
pub use service::{Embedder, OllamaEmbedder};

/// Default vector dimension of the `all-minilm` family.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
