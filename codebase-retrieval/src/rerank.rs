use ragcode_domain::{ChunkType, SearchResult};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Reorders a result list and assigns the final `relevance_score`.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Vec<SearchResult>;
}

/// Configuration for the heuristic reranker.
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    /// Path substrings that deserve a boost (high-signal locations)
    pub priority_paths: Vec<String>,
    /// Decay constant of the recency bonus
    pub recency_half_life: Duration,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            priority_paths: ["cmd/", "api/", "main", "handler", "server"]
                .into_iter()
                .map(String::from)
                .collect(),
            recency_half_life: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// Multiplies each result's score by a stack of signals: chunk-type weight,
/// exact and token-level content matches, path matches, priority paths, and
/// how recently the file was modified.
pub struct HeuristicReranker {
    config: HeuristicConfig,
}

impl HeuristicReranker {
    pub fn new() -> Self {
        Self::with_config(HeuristicConfig::default())
    }

    pub fn with_config(mut config: HeuristicConfig) -> Self {
        if config.recency_half_life.is_zero() {
            config.recency_half_life = Duration::from_secs(30 * 24 * 3600);
        }
        Self { config }
    }

    fn type_weight(chunk_type: ChunkType) -> f32 {
        match chunk_type {
            ChunkType::Function => 1.2,
            ChunkType::Method => 1.15,
            ChunkType::Class => 1.1,
            ChunkType::Import => 0.8,
            ChunkType::Comment => 0.5,
            ChunkType::Other => 1.0,
        }
    }

    /// Multiplier in [1.0, 1.3] decaying exponentially with file age.
    /// Files whose mtime cannot be read contribute no bonus.
    fn recency_bonus(&self, file_path: &str) -> f32 {
        let Ok(modified) = std::fs::metadata(file_path).and_then(|m| m.modified()) else {
            return 1.0;
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        let ratio = age.as_secs_f64() / self.config.recency_half_life.as_secs_f64();
        let bonus = 0.3 * (-ratio).exp();
        debug!(file = file_path, bonus, "recency bonus");
        1.0 + bonus as f32
    }
}

impl Default for HeuristicReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker for HeuristicReranker {
    fn rerank(&self, query: &str, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
        if results.is_empty() {
            return results;
        }

        let query_lower = query.to_lowercase();
        let query_tokens: Vec<&str> = query_lower.split_whitespace().collect();

        for result in &mut results {
            let mut score = result.score;
            let chunk = &result.chunk;

            score *= Self::type_weight(chunk.chunk_type);

            let content_lower = chunk.content.to_lowercase();
            if content_lower.contains(&query_lower) {
                score *= 1.5;
            }

            let matched = query_tokens
                .iter()
                .filter(|t| t.len() >= 3 && content_lower.contains(*t))
                .count();
            if !query_tokens.is_empty() && matched > 0 {
                score *= 1.0 + 0.3 * matched as f32 / query_tokens.len() as f32;
            }

            let path_lower = chunk.file_path.to_lowercase();
            if query_tokens
                .iter()
                .any(|t| t.len() >= 3 && path_lower.contains(*t))
            {
                score *= 1.1;
            }

            if self
                .config
                .priority_paths
                .iter()
                .any(|p| path_lower.contains(&p.to_lowercase()))
            {
                score *= 1.15;
            }

            score *= self.recency_bonus(&chunk.file_path);

            result.relevance_score = score;
        }

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }
}

/// Maximal Marginal Relevance selection wrapped around an inner reranker.
///
/// `MMR(c) = λ · relevance(c) − (1 − λ) · max_{s ∈ selected} cos(c, s)`
///
/// Greedy: repeatedly move the highest-MMR candidate into the selected set.
/// Candidates without embeddings contribute zero similarity.
pub struct MmrReranker {
    inner: Box<dyn Reranker>,
    lambda: f32,
}

impl MmrReranker {
    /// `lambda` trades relevance against diversity (0 = pure diversity,
    /// 1 = pure relevance); out-of-range values fall back to 0.7.
    pub fn new(inner: Box<dyn Reranker>, lambda: f32) -> Self {
        let lambda = if (0.0..=1.0).contains(&lambda) { lambda } else { 0.7 };
        Self { inner, lambda }
    }

    fn max_similarity(candidate: &SearchResult, selected: &[SearchResult]) -> f32 {
        if candidate.chunk.embedding.is_empty() {
            return 0.0;
        }
        selected
            .iter()
            .filter(|s| !s.chunk.embedding.is_empty())
            .map(|s| cosine_similarity(&candidate.chunk.embedding, &s.chunk.embedding))
            .fold(0.0, f32::max)
    }
}

impl Reranker for MmrReranker {
    fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let ranked = self.inner.rerank(query, results);
        if ranked.is_empty() {
            return ranked;
        }

        let total = ranked.len();
        let mut candidates = ranked;
        let mut selected: Vec<SearchResult> = Vec::with_capacity(total);

        while !candidates.is_empty() {
            let mut best_index = 0;
            let mut best_mmr = f32::NEG_INFINITY;

            for (i, candidate) in candidates.iter().enumerate() {
                let similarity = Self::max_similarity(candidate, &selected);
                let mmr = self.lambda * candidate.relevance_score - (1.0 - self.lambda) * similarity;
                if mmr > best_mmr {
                    best_mmr = mmr;
                    best_index = i;
                }
            }

            selected.push(candidates.remove(best_index));
        }

        debug!(input = total, output = selected.len(), "mmr selection complete");
        selected
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragcode_domain::{CodeChunk, SearchSource};

    fn result(path: &str, ty: ChunkType, content: &str, score: f32) -> SearchResult {
        let chunk = CodeChunk::new(path, "go", ty, content, 1, 3);
        SearchResult::new(chunk, score, SearchSource::Hybrid)
    }

    #[test]
    fn function_match_beats_higher_scored_comment() {
        let reranker = HeuristicReranker::new();

        let c1 = result("solver.go", ChunkType::Function, "func solve()", 0.8);
        let c2 = result("helper.go", ChunkType::Comment, "solves nothing", 0.9);
        let c3 = result("models.go", ChunkType::Class, "type Solver struct", 0.7);

        let ranked = reranker.rerank("solve", vec![c1, c2, c3]);

        let paths: Vec<&str> = ranked.iter().map(|r| r.chunk.file_path.as_str()).collect();
        assert_eq!(paths, vec!["solver.go", "models.go", "helper.go"]);
        assert!(ranked[0].relevance_score > ranked[1].relevance_score);
    }

    #[test]
    fn priority_paths_boost_once() {
        let reranker = HeuristicReranker::new();
        let plain = result("util/misc.go", ChunkType::Other, "nothing relevant", 1.0);
        let priority = result("api/handler.go", ChunkType::Other, "nothing relevant", 1.0);

        let ranked = reranker.rerank("unrelated-query", vec![plain, priority]);
        assert_eq!(ranked[0].chunk.file_path, "api/handler.go");
        assert!((ranked[0].relevance_score - 1.15).abs() < 1e-6);
        assert!((ranked[1].relevance_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn token_coverage_scales_with_matches() {
        let reranker = HeuristicReranker::new();
        let full = result("a.txt", ChunkType::Other, "parse tokens quickly", 1.0);
        let half = result("b.txt", ChunkType::Other, "parse something else", 1.0);

        let ranked = reranker.rerank("parse tokens", vec![half, full]);
        assert_eq!(ranked[0].chunk.file_path, "a.txt");
        // Full coverage: ×1.3 for 2/2 tokens (the exact-phrase bonus also
        // applies); half coverage: ×1.15.
        assert!(ranked[0].relevance_score > ranked[1].relevance_score);
        assert!((ranked[1].relevance_score - 1.15).abs() < 1e-6);
    }

    #[test]
    fn recent_files_outrank_stale_ones() {
        let dir = tempfile::tempdir().unwrap();
        let fresh_path = dir.path().join("fresh.txt");
        std::fs::write(&fresh_path, "content").unwrap();

        let reranker = HeuristicReranker::new();
        let fresh = result(fresh_path.to_str().unwrap(), ChunkType::Other, "abc", 1.0);
        let missing = result("/no/such/file.txt", ChunkType::Other, "abc", 1.0);

        let ranked = reranker.rerank("zzz", vec![missing, fresh]);
        assert_eq!(ranked[0].chunk.file_path, fresh_path.to_str().unwrap());
        // A just-written file gets close to the full 30% bonus.
        assert!(ranked[0].relevance_score > 1.25);
        assert!((ranked[1].relevance_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mmr_keeps_cardinality_and_best_first() {
        let mut a = result("a.rs", ChunkType::Other, "alpha", 0.9);
        a.chunk.embedding = vec![1.0, 0.0];
        let mut b = result("b.rs", ChunkType::Other, "beta", 0.85);
        b.chunk.embedding = vec![1.0, 0.0]; // identical to a
        let mut c = result("c.rs", ChunkType::Other, "gamma", 0.5);
        c.chunk.embedding = vec![0.0, 1.0]; // orthogonal

        struct Identity;
        impl Reranker for Identity {
            fn rerank(&self, _query: &str, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
                for r in &mut results {
                    r.relevance_score = r.score;
                }
                results.sort_by(|x, y| y.relevance_score.partial_cmp(&x.relevance_score).unwrap());
                results
            }
        }

        let mmr = MmrReranker::new(Box::new(Identity), 0.7);
        let ranked = mmr.rerank("q", vec![a, b, c]);

        assert_eq!(ranked.len(), 3);
        // First pick is the relevance argmax.
        assert_eq!(ranked[0].chunk.file_path, "a.rs");
        // The orthogonal-but-weaker chunk displaces the near-duplicate:
        // b scores 0.7·0.85 − 0.3·1.0 = 0.295, c scores 0.7·0.5 − 0 = 0.35.
        assert_eq!(ranked[1].chunk.file_path, "c.rs");
        assert_eq!(ranked[2].chunk.file_path, "b.rs");
    }

    #[test]
    fn mmr_without_embeddings_degrades_to_relevance_order() {
        struct Identity;
        impl Reranker for Identity {
            fn rerank(&self, _query: &str, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
                for r in &mut results {
                    r.relevance_score = r.score;
                }
                results
            }
        }

        let mmr = MmrReranker::new(Box::new(Identity), 0.7);
        let ranked = mmr.rerank(
            "q",
            vec![
                result("low.rs", ChunkType::Other, "x", 0.2),
                result("high.rs", ChunkType::Other, "y", 0.9),
            ],
        );
        assert_eq!(ranked[0].chunk.file_path, "high.rs");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn out_of_range_lambda_falls_back() {
        struct Identity;
        impl Reranker for Identity {
            fn rerank(&self, _query: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
                results
            }
        }
        let mmr = MmrReranker::new(Box::new(Identity), 7.0);
        assert!((mmr.lambda - 0.7).abs() < 1e-6);
    }
}
