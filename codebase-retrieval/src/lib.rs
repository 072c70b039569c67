//! Hybrid retrieval: dense + BM25 fusion, heuristic and MMR reranking,
//! per-file diversity capping, and graph-based context expansion.
//!
//! ```text
//! query ──> preprocess ──┬──> embed ──> dense top-2K ──┐
//!                        └──> tokens ──> sparse top-2K ─┴─> fuse
//!                                                           │
//!                     rerank (heuristic, optionally MMR) <──┘
//!                                                           │
//!                         per-file cap ──> graph expansion ─┴─> results
//! ```

mod config;
mod error;
mod expander;
mod fusion;
mod hierarchy;
mod rerank;
mod retriever;

pub use config::{FusionConfig, FusionStrategy};
pub use error::RetrievalError;
pub use expander::{ContextExpander, ExpandConfig};
pub use fusion::{dedupe_results, fuse_results, truncate_results};
pub use hierarchy::HierarchicalFilter;
pub use rerank::{HeuristicConfig, HeuristicReranker, MmrReranker, Reranker};
pub use retriever::{Retriever, RetrieverBuilder};
