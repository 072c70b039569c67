use crate::config::{FusionConfig, FusionStrategy};
use ragcode_domain::{SearchResult, SearchSource};
use std::collections::HashMap;
use tracing::debug;

/// Combine the dense and keyword result lists with the configured strategy.
/// All strategies deduplicate by chunk id and sort by the fused score
/// descending.
pub fn fuse_results(
    vector_results: Vec<SearchResult>,
    keyword_results: Vec<SearchResult>,
    config: FusionConfig,
) -> Vec<SearchResult> {
    debug!(
        vector = vector_results.len(),
        keyword = keyword_results.len(),
        strategy = ?config.strategy,
        "fusing result lists"
    );

    match config.strategy {
        FusionStrategy::Rrf => reciprocal_rank_fusion(vector_results, keyword_results, config.rrf_k),
        FusionStrategy::Weighted => {
            weighted_combination(vector_results, keyword_results, config.vector_weight)
        }
        FusionStrategy::Max => max_score_fusion(vector_results, keyword_results),
    }
}

struct FusionSlot {
    result: SearchResult,
    fused: f32,
}

/// RRF: `score(d) = Σ 1 / (k + rank(d) + 1)` over the lists containing `d`.
fn reciprocal_rank_fusion(
    vector_results: Vec<SearchResult>,
    keyword_results: Vec<SearchResult>,
    k: f32,
) -> Vec<SearchResult> {
    let mut slots: HashMap<String, FusionSlot> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (rank, mut result) in vector_results.into_iter().enumerate() {
        let id = result.chunk.id.clone();
        let rrf = 1.0 / (k + rank as f32 + 1.0);
        result.vector_score = result.score;
        match slots.get_mut(&id) {
            Some(slot) => slot.fused += rrf,
            None => {
                order.push(id.clone());
                slots.insert(id, FusionSlot { result, fused: rrf });
            }
        }
    }

    for (rank, keyword) in keyword_results.into_iter().enumerate() {
        let id = keyword.chunk.id.clone();
        let rrf = 1.0 / (k + rank as f32 + 1.0);
        match slots.get_mut(&id) {
            Some(slot) => {
                slot.fused += rrf;
                slot.result.keyword_score = keyword.score;
            }
            None => {
                order.push(id.clone());
                let mut result = keyword;
                result.keyword_score = result.score;
                slots.insert(id, FusionSlot { result, fused: rrf });
            }
        }
    }

    finish(slots, order)
}

/// `score = α · v + (1 − α) · kw` over min-max normalized lists.
fn weighted_combination(
    vector_results: Vec<SearchResult>,
    keyword_results: Vec<SearchResult>,
    alpha: f32,
) -> Vec<SearchResult> {
    let vector_results = normalize_scores(vector_results);
    let keyword_results = normalize_scores(keyword_results);

    let mut slots: HashMap<String, FusionSlot> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for mut result in vector_results {
        let id = result.chunk.id.clone();
        result.vector_score = result.score;
        order.push(id.clone());
        slots.insert(id, FusionSlot { result, fused: 0.0 });
    }

    for keyword in keyword_results {
        let id = keyword.chunk.id.clone();
        match slots.get_mut(&id) {
            Some(slot) => slot.result.keyword_score = keyword.score,
            None => {
                order.push(id.clone());
                let mut result = keyword;
                result.keyword_score = result.score;
                result.vector_score = 0.0;
                slots.insert(id, FusionSlot { result, fused: 0.0 });
            }
        }
    }

    for slot in slots.values_mut() {
        slot.fused = alpha * slot.result.vector_score + (1.0 - alpha) * slot.result.keyword_score;
    }

    finish(slots, order)
}

/// `score = max(v, kw)` per chunk.
fn max_score_fusion(
    vector_results: Vec<SearchResult>,
    keyword_results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let mut slots: HashMap<String, FusionSlot> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for mut result in vector_results {
        let id = result.chunk.id.clone();
        result.vector_score = result.score;
        let fused = result.score;
        order.push(id.clone());
        slots.insert(id, FusionSlot { result, fused });
    }

    for keyword in keyword_results {
        let id = keyword.chunk.id.clone();
        match slots.get_mut(&id) {
            Some(slot) => {
                slot.result.keyword_score = keyword.score;
                slot.fused = slot.fused.max(keyword.score);
            }
            None => {
                order.push(id.clone());
                let fused = keyword.score;
                let mut result = keyword;
                result.keyword_score = result.score;
                slots.insert(id, FusionSlot { result, fused });
            }
        }
    }

    finish(slots, order)
}

fn finish(mut slots: HashMap<String, FusionSlot>, order: Vec<String>) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = order
        .into_iter()
        .filter_map(|id| slots.remove(&id))
        .map(|slot| {
            let mut result = slot.result;
            result.score = slot.fused;
            result.source = SearchSource::Hybrid;
            result
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Min-max normalization into [0, 1]; a constant list is returned unchanged.
fn normalize_scores(results: Vec<SearchResult>) -> Vec<SearchResult> {
    if results.is_empty() {
        return results;
    }

    let min = results.iter().map(|r| r.score).fold(f32::INFINITY, f32::min);
    let max = results.iter().map(|r| r.score).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range == 0.0 {
        return results;
    }

    results
        .into_iter()
        .map(|mut r| {
            r.score = (r.score - min) / range;
            r
        })
        .collect()
}

/// Remove duplicate chunks by id, keeping the first occurrence.
pub fn dedupe_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.chunk.id.clone()))
        .collect()
}

/// Cap a result list at `max_results`; zero means unlimited.
pub fn truncate_results(mut results: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    if max_results > 0 && results.len() > max_results {
        results.truncate(max_results);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragcode_domain::{ChunkType, CodeChunk};

    fn result(path: &str, score: f32, source: SearchSource) -> SearchResult {
        let chunk = CodeChunk::new(path, "rust", ChunkType::Function, format!("fn x() // {path}"), 1, 3);
        SearchResult::new(chunk, score, source)
    }

    #[test]
    fn rrf_ranks_shared_documents_first() {
        // Vector list [1, 2], keyword list [2, 3]: doc 2 gets 2/61, the
        // others 1/61 each.
        let doc1 = result("doc1.rs", 0.9, SearchSource::Vector);
        let doc2v = result("doc2.rs", 0.8, SearchSource::Vector);
        let doc2k = SearchResult::new(doc2v.chunk.clone(), 5.0, SearchSource::Keyword);
        let doc3 = result("doc3.rs", 4.0, SearchSource::Keyword);

        let fused = fuse_results(
            vec![doc1.clone(), doc2v],
            vec![doc2k, doc3],
            FusionConfig::default(),
        );

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk.file_path, "doc2.rs");
        assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-6);
        assert!((fused[1].score - 1.0 / 61.0).abs() < 1e-6);
        assert_eq!(fused[0].source, SearchSource::Hybrid);
        // Per-side scores survive fusion.
        assert_eq!(fused[0].vector_score, 0.8);
        assert_eq!(fused[0].keyword_score, 5.0);
    }

    #[test]
    fn rrf_of_identical_lists_doubles_scores() {
        let a = result("a.rs", 0.9, SearchSource::Vector);
        let b = result("b.rs", 0.8, SearchSource::Vector);
        let list = vec![a, b];

        let fused = fuse_results(list.clone(), list.clone(), FusionConfig::default());

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].chunk.id, list[0].chunk.id);
        assert_eq!(fused[1].chunk.id, list[1].chunk.id);
        assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-6);
        assert!((fused[1].score - 2.0 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_fusion_normalizes_then_blends() {
        let config = FusionConfig {
            strategy: FusionStrategy::Weighted,
            vector_weight: 0.7,
            ..Default::default()
        };

        let v1 = result("v1.rs", 10.0, SearchSource::Vector);
        let v2 = result("v2.rs", 0.0, SearchSource::Vector);
        let k1 = SearchResult::new(v2.chunk.clone(), 3.0, SearchSource::Keyword);
        let k2 = result("k2.rs", 1.0, SearchSource::Keyword);

        let fused = fuse_results(vec![v1, v2], vec![k1, k2], config);

        // v1 normalizes to 1.0 → 0.7; v2 normalizes to 0 but its keyword side
        // normalizes to 1.0 → 0.3.
        assert_eq!(fused[0].chunk.file_path, "v1.rs");
        assert!((fused[0].score - 0.7).abs() < 1e-6);
        let v2_slot = fused.iter().find(|r| r.chunk.file_path == "v2.rs").unwrap();
        assert!((v2_slot.score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn max_fusion_takes_the_larger_side() {
        let config = FusionConfig {
            strategy: FusionStrategy::Max,
            ..Default::default()
        };

        let v = result("shared.rs", 0.6, SearchSource::Vector);
        let k = SearchResult::new(v.chunk.clone(), 0.9, SearchSource::Keyword);

        let fused = fuse_results(vec![v], vec![k], config);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].score, 0.9);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let a = result("a.rs", 0.9, SearchSource::Vector);
        let duplicate = SearchResult::new(a.chunk.clone(), 0.1, SearchSource::Keyword);
        let b = result("b.rs", 0.5, SearchSource::Vector);

        let deduped = dedupe_results(vec![a.clone(), duplicate, b]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].score, 0.9);
    }

    #[test]
    fn truncate_caps_but_zero_means_unlimited() {
        let results = vec![
            result("a.rs", 0.9, SearchSource::Vector),
            result("b.rs", 0.8, SearchSource::Vector),
        ];
        assert_eq!(truncate_results(results.clone(), 1).len(), 1);
        assert_eq!(truncate_results(results, 0).len(), 2);
    }
}
