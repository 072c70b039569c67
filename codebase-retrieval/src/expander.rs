use ragcode_domain::{ExpansionKind, SearchResult, SearchSource};
use ragcode_graph::{DependencyGraph, Node, Relation};
use ragcode_vector_store::ChunkStore;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for graph-based context expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpandConfig {
    pub include_callees: bool,
    pub include_callers: bool,
    pub include_parent_type: bool,
    pub include_child_methods: bool,
    /// Imports are usually too broad to be worth the budget
    pub include_imports: bool,
    pub max_depth: usize,
    /// Total output cap, initial results included
    pub max_chunks: usize,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            include_callees: true,
            include_callers: true,
            include_parent_type: true,
            include_child_methods: true,
            include_imports: false,
            max_depth: 1,
            max_chunks: 50,
        }
    }
}

/// Fixed scores assigned to expansion results, by category.
fn expansion_score(kind: ExpansionKind) -> f32 {
    match kind {
        ExpansionKind::Callee => 0.5,
        ExpansionKind::Caller => 0.4,
        ExpansionKind::ParentType | ExpansionKind::ChildMethod => 0.55,
        ExpansionKind::Import => 0.3,
    }
}

/// Enlarges a retrieval result set by walking the dependency graph from the
/// initial hits: callees, callers, the parent type of a method, a type's
/// methods, and optionally imports, within depth and count budgets.
pub struct ContextExpander {
    graph: Arc<DependencyGraph>,
    store: Arc<dyn ChunkStore>,
}

impl ContextExpander {
    pub fn new(graph: Arc<DependencyGraph>, store: Arc<dyn ChunkStore>) -> Self {
        Self { graph, store }
    }

    /// Bounded BFS rooted at each initial result. A chunk already seen is
    /// never added again; the walk stops when `max_chunks` results have
    /// accumulated or every branch is exhausted.
    pub async fn expand(
        &self,
        results: Vec<SearchResult>,
        config: ExpandConfig,
    ) -> Vec<SearchResult> {
        let initial = results.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        let mut output = Vec::with_capacity(results.len());

        for result in results {
            if result.chunk.id.is_empty() {
                continue;
            }
            seen.insert(result.chunk.id.clone());
            queue.push_back((result.chunk.id.clone(), 0));
            output.push(result);
        }

        while let Some((id, depth)) = queue.pop_front() {
            if output.len() >= config.max_chunks {
                break;
            }
            if depth >= config.max_depth {
                continue;
            }

            for (enabled, kind, neighbors) in self.neighbor_sets(&id, config) {
                if !enabled {
                    continue;
                }
                for node in neighbors {
                    if output.len() >= config.max_chunks {
                        break;
                    }
                    if seen.contains(&node.id) {
                        continue;
                    }

                    let chunk = match self.store.get(&node.id).await {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            debug!(id = %node.id, error = %e, "related chunk unavailable");
                            continue;
                        }
                    };

                    debug!(
                        source = %id,
                        target = %node.id,
                        kind = kind.as_str(),
                        "expanding context"
                    );

                    seen.insert(node.id.clone());
                    let score = expansion_score(kind);
                    let mut result =
                        SearchResult::new(chunk, score, SearchSource::Expansion(kind));
                    result.relevance_score = score;
                    output.push(result);
                    queue.push_back((node.id.clone(), depth + 1));
                }
            }
        }

        info!(initial, expanded = output.len(), "context expansion complete");
        output
    }

    fn neighbor_sets(
        &self,
        id: &str,
        config: ExpandConfig,
    ) -> [(bool, ExpansionKind, Vec<Node>); 5] {
        [
            (
                config.include_callees,
                ExpansionKind::Callee,
                self.graph.related(id, Some(Relation::Call)),
            ),
            (
                config.include_callers,
                ExpansionKind::Caller,
                self.graph.incoming(id, Some(Relation::Call)),
            ),
            (
                config.include_parent_type,
                ExpansionKind::ParentType,
                self.graph.incoming(id, Some(Relation::Define)),
            ),
            (
                config.include_child_methods,
                ExpansionKind::ChildMethod,
                self.graph.related(id, Some(Relation::Define)),
            ),
            (
                config.include_imports,
                ExpansionKind::Import,
                self.graph.related(id, Some(Relation::Import)),
            ),
        ]
    }
}
