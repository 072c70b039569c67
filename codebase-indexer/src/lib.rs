//! Ingest orchestration: the incremental indexing pipeline and the
//! filesystem watcher feeding it.
//!
//! Per file: `language gate → hash gate → segment → chunk → embed in
//! sub-batches → delete-by-path → upsert with retry → sparse index → graph`.
//! Directory walks fan the per-file pipeline out to a bounded worker pool;
//! per-file failures are collected and summarized, never aborting the walk.

mod error;
mod indexer;
mod metrics;
mod watcher;

pub use error::IndexerError;
pub use indexer::{Indexer, IndexerConfig};
pub use metrics::IndexMetrics;
pub use watcher::{FileEvent, Watcher};
