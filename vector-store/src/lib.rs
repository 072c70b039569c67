//! Chunk persistence and k-NN search.
//!
//! The core depends only on the [`ChunkStore`] capability: upsert chunks,
//! delete everything under a file path, fetch by id, cosine-similarity
//! search. [`QdrantStore`] is the production adapter; [`MemoryVectorStore`]
//! backs tests and small setups without an external database.

mod error;
mod store;
mod store_memory;

pub use error::VectorStoreError;
pub use store::{ChunkStore, QdrantStore};
pub use store_memory::MemoryVectorStore;
