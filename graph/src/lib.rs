//! In-memory symbol dependency graph.
//!
//! Nodes are chunks, edges are tagged `import`, `call`, or `define`. The
//! graph is an id-keyed arena with separate outgoing/incoming adjacency maps
//! and a name index; no node ever holds a reference to another node, so
//! concurrent reads are trivially safe behind the read/write lock.

mod builder;
mod graph;

pub use builder::GraphBuilder;
pub use graph::{DependencyGraph, Edge, GraphStats, Node, Relation};
