use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Kind of relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Import,
    Call,
    Define,
}

/// A code entity in the graph. The id always equals a chunk id; consumers
/// tolerate lookups of nodes whose chunk is not (yet) in the chunk store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub node_type: String,
    pub name: String,
    pub file_path: String,
    pub metadata: HashMap<String, String>,
}

/// A directed, relation-tagged edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, Node>,
    outgoing: HashMap<String, Vec<Edge>>,
    incoming: HashMap<String, Vec<Edge>>,
    by_name: HashMap<String, Vec<String>>,
}

/// Bidirectional dependency graph guarded by a single read/write lock.
/// Writers (`add_node`, `add_edge`, `clear`) are exclusive; readers share.
/// Removing a single node is not supported; `clear` + rebuild is the reset.
#[derive(Default)]
pub struct DependencyGraph {
    inner: RwLock<Inner>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        let mut inner = self.inner.write().expect("graph lock poisoned");
        if !node.name.is_empty() {
            inner
                .by_name
                .entry(node.name.clone())
                .or_default()
                .push(node.id.clone());
        }
        inner.nodes.insert(node.id.clone(), node);
    }

    pub fn add_edge(&self, from: impl Into<String>, to: impl Into<String>, relation: Relation) {
        let edge = Edge {
            from: from.into(),
            to: to.into(),
            relation,
        };
        let mut inner = self.inner.write().expect("graph lock poisoned");
        inner
            .outgoing
            .entry(edge.from.clone())
            .or_default()
            .push(edge.clone());
        inner.incoming.entry(edge.to.clone()).or_default().push(edge);
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.inner
            .read()
            .expect("graph lock poisoned")
            .nodes
            .get(id)
            .cloned()
    }

    /// Every node registered under the given name; ambiguity across files is
    /// expected and all matches are returned.
    pub fn nodes_by_name(&self, name: &str) -> Vec<Node> {
        let inner = self.inner.read().expect("graph lock poisoned");
        inner
            .by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.nodes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Outgoing neighbors filtered by relation; `None` returns all, deduped.
    pub fn related(&self, id: &str, relation: Option<Relation>) -> Vec<Node> {
        let inner = self.inner.read().expect("graph lock poisoned");
        Self::neighbors(&inner, inner.outgoing.get(id), relation, |edge| &edge.to)
    }

    /// Incoming neighbors filtered by relation; `None` returns all, deduped.
    pub fn incoming(&self, id: &str, relation: Option<Relation>) -> Vec<Node> {
        let inner = self.inner.read().expect("graph lock poisoned");
        Self::neighbors(&inner, inner.incoming.get(id), relation, |edge| &edge.from)
    }

    /// File paths of every node that directly calls or imports the given
    /// node. Useful for "who uses this" expansion.
    pub fn parent_files(&self, id: &str) -> Vec<String> {
        let callers = self.incoming(id, Some(Relation::Call));
        let importers = self.incoming(id, Some(Relation::Import));

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for node in callers.into_iter().chain(importers) {
            if !node.file_path.is_empty() && seen.insert(node.file_path.clone()) {
                files.push(node.file_path);
            }
        }
        files
    }

    pub fn clear(&self) {
        *self.inner.write().expect("graph lock poisoned") = Inner::default();
    }

    pub fn stats(&self) -> GraphStats {
        let inner = self.inner.read().expect("graph lock poisoned");
        GraphStats {
            nodes: inner.nodes.len(),
            edges: inner.outgoing.values().map(Vec::len).sum(),
        }
    }

    fn neighbors<'a>(
        inner: &Inner,
        edges: Option<&'a Vec<Edge>>,
        relation: Option<Relation>,
        endpoint: impl Fn(&'a Edge) -> &'a String,
    ) -> Vec<Node> {
        let Some(edges) = edges else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for edge in edges {
            if let Some(filter) = relation {
                if edge.relation != filter {
                    continue;
                }
            }
            let id = endpoint(edge);
            if seen.insert(id.as_str()) {
                if let Some(node) = inner.nodes.get(id) {
                    nodes.push(node.clone());
                }
            }
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, name: &str, file: &str) -> Node {
        Node {
            id: id.into(),
            node_type: "function".into(),
            name: name.into(),
            file_path: file.into(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn name_index_returns_all_matches() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a", "handler", "a.rs"));
        graph.add_node(node("b", "handler", "b.rs"));
        graph.add_node(node("c", "other", "c.rs"));

        let matches = graph.nodes_by_name("handler");
        assert_eq!(matches.len(), 2);
        assert!(graph.nodes_by_name("ghost").is_empty());
    }

    #[test]
    fn edges_are_bidirectional() {
        let graph = DependencyGraph::new();
        graph.add_node(node("caller", "caller", "x.rs"));
        graph.add_node(node("callee", "callee", "y.rs"));
        graph.add_edge("caller", "callee", Relation::Call);

        let related = graph.related("caller", Some(Relation::Call));
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, "callee");

        let incoming = graph.incoming("callee", Some(Relation::Call));
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, "caller");
    }

    #[test]
    fn relation_filter_and_unfiltered_reads() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a", "a", "a.rs"));
        graph.add_node(node("b", "b", "b.rs"));
        graph.add_edge("a", "b", Relation::Call);
        graph.add_edge("a", "b", Relation::Import);

        assert_eq!(graph.related("a", Some(Relation::Call)).len(), 1);
        assert_eq!(graph.related("a", Some(Relation::Define)).len(), 0);
        // Unfiltered reads dedupe repeated endpoints.
        assert_eq!(graph.related("a", None).len(), 1);
    }

    #[test]
    fn edges_to_unknown_nodes_are_tolerated() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a", "a", "a.rs"));
        graph.add_edge("a", "phantom", Relation::Call);

        // The edge exists, but the endpoint has no node yet.
        assert!(graph.related("a", Some(Relation::Call)).is_empty());
        assert_eq!(graph.stats().edges, 1);
    }

    #[test]
    fn parent_files_dedupes_callers_and_importers() {
        let graph = DependencyGraph::new();
        graph.add_node(node("target", "target", "t.rs"));
        graph.add_node(node("c1", "c1", "shared.rs"));
        graph.add_node(node("c2", "c2", "shared.rs"));
        graph.add_node(node("i1", "i1", "importer.rs"));
        graph.add_edge("c1", "target", Relation::Call);
        graph.add_edge("c2", "target", Relation::Call);
        graph.add_edge("i1", "target", Relation::Import);

        let files = graph.parent_files("target");
        assert_eq!(files.len(), 2);
        assert!(files.contains(&"shared.rs".to_string()));
        assert!(files.contains(&"importer.rs".to_string()));
    }

    #[test]
    fn clear_resets_the_arena() {
        let graph = DependencyGraph::new();
        graph.add_node(node("a", "a", "a.rs"));
        graph.add_edge("a", "a", Relation::Call);
        graph.clear();

        assert_eq!(graph.stats(), GraphStats { nodes: 0, edges: 0 });
        assert!(graph.node("a").is_none());
    }
}
