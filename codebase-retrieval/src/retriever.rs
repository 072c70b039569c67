use crate::config::FusionConfig;
use crate::error::RetrievalError;
use crate::expander::{ContextExpander, ExpandConfig};
use crate::fusion::{fuse_results, truncate_results};
use crate::hierarchy::HierarchicalFilter;
use crate::rerank::Reranker;
use ragcode_domain::{SearchQuery, SearchResult, SearchSource};
use ragcode_embeddings::Embedder;
use ragcode_sparse_index::{Bm25Scorer, KeywordIndex, QueryPreprocessor};
use ragcode_vector_store::ChunkStore;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_MAX_RESULTS: usize = 10;

/// Top-level hybrid retrieval orchestration.
///
/// Dense and keyword candidates are gathered independently, fused, reranked,
/// capped per file, and expanded through the dependency graph. The keyword
/// side is optional: without a keyword index and scorer the retriever runs
/// dense-only.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    keyword: Option<Arc<dyn KeywordIndex>>,
    scorer: Option<Bm25Scorer>,
    preprocessor: QueryPreprocessor,
    reranker: Box<dyn Reranker>,
    hierarchy: HierarchicalFilter,
    expander: Option<ContextExpander>,
    expand_config: ExpandConfig,
    fusion: FusionConfig,
}

/// Assembles a [`Retriever`] from its collaborators.
pub struct RetrieverBuilder {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    keyword: Option<Arc<dyn KeywordIndex>>,
    scorer: Option<Bm25Scorer>,
    reranker: Option<Box<dyn Reranker>>,
    hierarchy: Option<HierarchicalFilter>,
    expander: Option<ContextExpander>,
    expand_config: ExpandConfig,
    fusion: FusionConfig,
}

impl RetrieverBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            embedder,
            store,
            keyword: None,
            scorer: None,
            reranker: None,
            hierarchy: None,
            expander: None,
            expand_config: ExpandConfig::default(),
            fusion: FusionConfig::default(),
        }
    }

    /// Enable the keyword side: sparse candidate search plus BM25 scoring.
    pub fn keyword_search(mut self, index: Arc<dyn KeywordIndex>, scorer: Bm25Scorer) -> Self {
        self.keyword = Some(index);
        self.scorer = Some(scorer);
        self
    }

    pub fn reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn hierarchy(mut self, filter: HierarchicalFilter) -> Self {
        self.hierarchy = Some(filter);
        self
    }

    pub fn expander(mut self, expander: ContextExpander, config: ExpandConfig) -> Self {
        self.expander = Some(expander);
        self.expand_config = config;
        self
    }

    pub fn fusion(mut self, config: FusionConfig) -> Self {
        self.fusion = config;
        self
    }

    pub fn build(self) -> Result<Retriever, RetrievalError> {
        self.fusion
            .validate()
            .map_err(RetrievalError::InvalidConfig)?;

        Ok(Retriever {
            embedder: self.embedder,
            store: self.store,
            keyword: self.keyword,
            scorer: self.scorer,
            preprocessor: QueryPreprocessor::new(),
            reranker: self.reranker.unwrap_or_else(|| {
                Box::new(crate::rerank::HeuristicReranker::new())
            }),
            hierarchy: self.hierarchy.unwrap_or_else(|| HierarchicalFilter::new(3)),
            expander: self.expander,
            expand_config: self.expand_config,
            fusion: self.fusion,
        })
    }
}

impl Retriever {
    /// Retrieve relevant chunks for a query using hybrid search.
    pub async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, RetrievalError> {
        let max_results = if query.max_results == 0 {
            DEFAULT_MAX_RESULTS
        } else {
            query.max_results
        };
        info!(query = %query.query, max_results, "retrieving code chunks");

        let processed = self.preprocessor.preprocess(&query.query);
        if processed.filtered.is_empty() {
            warn!(query = %query.query, "query is empty after preprocessing");
        }

        // Dense side: an embedding failure is fatal, a search failure only
        // empties this side.
        let query_vector = self.embedder.embed(&query.query).await?;
        let vector_results = match self.store.search(&query_vector, max_results * 2).await {
            Ok(mut results) => {
                for result in &mut results {
                    result.source = SearchSource::Vector;
                    result.vector_score = result.score;
                }
                results
            }
            Err(e) => {
                error!(error = %e, "vector search failed");
                Vec::new()
            }
        };

        let keyword_results = self.keyword_search(&processed.filtered, max_results).await;

        let combined = match (vector_results.is_empty(), keyword_results.is_empty()) {
            (false, false) => fuse_results(vector_results, keyword_results, self.fusion),
            (false, true) => vector_results,
            _ => keyword_results,
        };

        let mut sorted = combined;
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let survivors = truncate_results(sorted, max_results);

        let reranked = self.reranker.rerank(&query.query, survivors);
        let capped = self.hierarchy.process(reranked);

        let expanded = match &self.expander {
            Some(expander) if self.expansion_enabled(query) => {
                expander.expand(capped, self.expand_config).await
            }
            _ => capped,
        };

        Ok(expanded)
    }

    fn expansion_enabled(&self, query: &SearchQuery) -> bool {
        query
            .filters
            .get("expand_context")
            .map(|v| v != "false")
            .unwrap_or(true)
    }

    /// Sparse candidates → chunk fetch → BM25 score. Individual lookup
    /// failures skip that id; a failed candidate search empties the side.
    async fn keyword_search(&self, tokens: &[String], max_results: usize) -> Vec<SearchResult> {
        let (Some(keyword), Some(scorer)) = (&self.keyword, &self.scorer) else {
            return Vec::new();
        };

        let doc_ids = match keyword.search(tokens, max_results * 2).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "keyword search failed");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(doc_ids.len());
        for id in doc_ids {
            let Ok(chunk) = self.store.get(&id).await else {
                continue;
            };
            let Ok(score) = scorer.score(tokens, &id).await else {
                continue;
            };

            let mut result = SearchResult::new(chunk, score as f32, SearchSource::Keyword);
            result.keyword_score = score as f32;
            results.push(result);
        }
        results
    }

    /// Route freshly indexed chunks into the keyword index.
    pub async fn index_chunks(
        &self,
        chunks: &[ragcode_domain::CodeChunk],
    ) -> Result<(), RetrievalError> {
        if let Some(keyword) = &self.keyword {
            keyword.add_chunks(chunks).await?;
        }
        Ok(())
    }
}
