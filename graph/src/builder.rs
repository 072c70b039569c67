use crate::graph::{DependencyGraph, Node, Relation};
use ragcode_domain::{ChunkType, CodeChunk};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds graph nodes and edges from a chunk batch by resolving the names the
/// segmenter recorded (`imports`, `calls`, `receiver`, `types`).
pub struct GraphBuilder {
    graph: Arc<DependencyGraph>,
}

impl GraphBuilder {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self { graph }
    }

    /// Three passes over the batch: register every chunk as a node, resolve
    /// import/call references into edges, then link parent types to their
    /// methods with `define` edges. Name collisions across files are accepted
    /// as ambiguity and produce one edge per match.
    pub fn build(&self, chunks: &[CodeChunk]) {
        for chunk in chunks {
            self.graph.add_node(Node {
                id: chunk.id.clone(),
                node_type: chunk.chunk_type.as_str().to_string(),
                name: chunk.meta("name").to_string(),
                file_path: chunk.file_path.clone(),
                metadata: chunk.metadata.clone(),
            });
        }

        for chunk in chunks {
            self.add_reference_edges(chunk);
        }

        self.add_define_edges(chunks);

        let stats = self.graph.stats();
        info!(nodes = stats.nodes, edges = stats.edges, "built dependency graph");
    }

    /// Clear the graph and rebuild it from scratch.
    pub fn rebuild(&self, chunks: &[CodeChunk]) {
        self.graph.clear();
        self.build(chunks);
    }

    pub fn graph(&self) -> Arc<DependencyGraph> {
        Arc::clone(&self.graph)
    }

    fn add_reference_edges(&self, chunk: &CodeChunk) {
        for import in split_list(chunk.meta("imports")) {
            for target in self.graph.nodes_by_name(import) {
                self.graph.add_edge(&chunk.id, &target.id, Relation::Import);
            }
        }

        for call in split_list(chunk.meta("calls")) {
            // Package-level functions resolve on the portion after the last
            // dot; `recv.method` calls fall back to receiver-aware matching.
            let func_name = call.rsplit('.').next().unwrap_or(call);

            let mut targets = self.graph.nodes_by_name(func_name);
            if targets.is_empty() && call.contains('.') {
                targets = self.methods_named(func_name);
            }

            if targets.is_empty() {
                debug!(call, func_name, "no target found for call");
                continue;
            }

            for target in targets {
                self.graph.add_edge(&chunk.id, &target.id, Relation::Call);
            }
        }
    }

    /// Methods carry a `receiver`; a dotted call that resolves to nothing by
    /// exact name matches every method with that name instead.
    fn methods_named(&self, func_name: &str) -> Vec<Node> {
        self.graph
            .nodes_by_name(func_name)
            .into_iter()
            .filter(|node| !node.metadata.get("receiver").map(String::is_empty).unwrap_or(true))
            .collect()
    }

    fn add_define_edges(&self, chunks: &[CodeChunk]) {
        for chunk in chunks {
            if chunk.chunk_type != ChunkType::Method {
                continue;
            }
            let receiver = chunk.meta("receiver");
            if receiver.is_empty() {
                continue;
            }

            for parent in self.types_named(receiver, chunks) {
                self.graph.add_edge(&parent, &chunk.id, Relation::Define);
            }
        }
    }

    /// Type chunks defining `type_name`, matched by node name or by
    /// membership in a `types` metadata list (multi-type declaration blocks).
    fn types_named(&self, type_name: &str, chunks: &[CodeChunk]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut parents = Vec::new();

        for node in self.graph.nodes_by_name(type_name) {
            if node.node_type == ChunkType::Class.as_str() && seen.insert(node.id.clone()) {
                parents.push(node.id);
            }
        }

        for chunk in chunks {
            if chunk.chunk_type != ChunkType::Class {
                continue;
            }
            let in_types = split_list(chunk.meta("types"))
                .into_iter()
                .any(|t| t == type_name);
            if in_types && seen.insert(chunk.id.clone()) {
                parents.push(chunk.id.clone());
            }
        }

        parents
    }
}

fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
