//! Sparse keyword side of hybrid retrieval: an inverted index over a
//! key/value store, the query preprocessor that feeds it, and the Okapi BM25
//! scorer over its statistics.
//!
//! The [`KeywordIndex`] trait is the normative interface; [`RedisIndex`] is
//! the production adapter and [`MemoryIndex`] the in-process implementation
//! used by tests.

mod bm25;
mod error;
mod index;
mod memory;
mod preprocess;
mod redis_index;

pub use bm25::Bm25Scorer;
pub use error::SparseIndexError;
pub use index::{documents_from_chunks, IndexedDocument, KeywordIndex};
pub use memory::MemoryIndex;
pub use preprocess::{ProcessedQuery, QueryPreprocessor};
pub use redis_index::RedisIndex;
