//! Language-aware code segmentation and chunking.
//!
//! The segmenter turns a source file into an ordered list of
//! [`CodeChunk`](ragcode_domain::CodeChunk)s that honor semantic boundaries,
//! then the [`SemanticChunker`] applies the merge/split policy before ingest:
//!
//! ```text
//! Source file
//!     │
//!     ├──> Language detection (extension → closed tag set)
//!     │
//!     ├──> Segmentation
//!     │    ├─> AST strategy      (Rust, via syn)
//!     │    ├─> Pattern strategy  (regex anchors on top-level declarations)
//!     │    └─> Generic strategy  (fixed line windows, docs/config fallback)
//!     │
//!     └──> Chunking
//!          ├─> Merge doc comment + declaration pairs
//!          ├─> Split oversize chunks at natural boundaries
//!          └─> Carry forward overlap context between sub-chunks
//! ```

mod ast;
mod chunker;
mod error;
mod generic;
mod language;
mod pattern;
mod segmenter;

pub use ast::AstSegmenter;
pub use chunker::SemanticChunker;
pub use error::ChunkerError;
pub use generic::GenericSegmenter;
pub use language::Language;
pub use pattern::PatternSegmenter;
pub use segmenter::{MultiSegmenter, Segmenter};

/// Default maximum chunk size in characters (the embedding model's budget).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 512;

/// Default overlap carried between sub-chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
