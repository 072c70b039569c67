use crate::error::SparseIndexError;
use crate::index::KeywordIndex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Okapi BM25 over the keyword index statistics.
///
/// `score = Σ idf(t) · tf(t,d)·(k1+1) / (tf(t,d) + k1·(1 − b + b·|d|/avgdl))`
/// with `idf(t) = ln((N − df + 0.5)/(df + 0.5) + 1)`.
pub struct Bm25Scorer {
    k1: f64,
    b: f64,
    index: Arc<dyn KeywordIndex>,
}

impl Bm25Scorer {
    /// Typical parameters are `k1 = 1.2`, `b = 0.75`.
    pub fn new(k1: f64, b: f64, index: Arc<dyn KeywordIndex>) -> Self {
        Self { k1, b, index }
    }

    /// Score one document against the query tokens. An empty collection,
    /// missing term, or missing document contributes zero rather than an
    /// error.
    pub async fn score(&self, query_tokens: &[String], doc_id: &str) -> Result<f64, SparseIndexError> {
        let doc_count = self.index.doc_count().await?;
        if doc_count == 0 {
            return Ok(0.0);
        }

        let avg_doc_length = self.index.avg_doc_length().await?;
        let doc_length = self.index.doc_length(doc_id).await?;

        let mut score = 0.0;
        for token in query_tokens {
            let tf = self.index.term_frequency(token, doc_id).await?;
            if tf == 0 {
                continue;
            }
            let df = self.index.doc_frequency(token).await?;
            if df == 0 {
                continue;
            }

            score += self.term_score(tf, df, doc_count, doc_length, avg_doc_length);
        }

        Ok(score)
    }

    /// Score a candidate list; documents that fail to score are omitted.
    pub async fn score_batch(
        &self,
        query_tokens: &[String],
        doc_ids: &[String],
    ) -> Result<HashMap<String, f64>, SparseIndexError> {
        let mut scores = HashMap::with_capacity(doc_ids.len());
        for doc_id in doc_ids {
            if let Ok(score) = self.score(query_tokens, doc_id).await {
                scores.insert(doc_id.clone(), score);
            }
        }
        Ok(scores)
    }

    /// Human-readable per-term breakdown of the score computation.
    pub async fn explain(
        &self,
        query_tokens: &[String],
        doc_id: &str,
    ) -> Result<String, SparseIndexError> {
        let doc_count = self.index.doc_count().await.unwrap_or(0);
        let avg_doc_length = self.index.avg_doc_length().await.unwrap_or(0.0);
        let doc_length = self.index.doc_length(doc_id).await.unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(out, "BM25 score breakdown");
        let _ = writeln!(out, "--------------------");
        let _ = writeln!(out, "parameters: k1={:.3} b={:.3}", self.k1, self.b);
        let _ = writeln!(
            out,
            "collection: docs={doc_count} avg_len={avg_doc_length:.3} doc_len={doc_length}"
        );

        let mut total = 0.0;
        for token in query_tokens {
            let tf = self.index.term_frequency(token, doc_id).await.unwrap_or(0);
            let df = self.index.doc_frequency(token).await.unwrap_or(0);

            if tf == 0 || df == 0 {
                let _ = writeln!(out, "  '{token}': not found in document");
                continue;
            }

            let term_score = self.term_score(tf, df, doc_count, doc_length, avg_doc_length);
            total += term_score;
            let _ = writeln!(out, "  '{token}': tf={tf} df={df} score={term_score:.4}");
        }

        let _ = writeln!(out, "total: {total:.4}");
        Ok(out)
    }

    fn term_score(&self, tf: i64, df: i64, doc_count: i64, doc_length: i64, avg_doc_length: f64) -> f64 {
        let idf = (((doc_count as f64 - df as f64 + 0.5) / (df as f64 + 0.5)) + 1.0).ln();

        let length_norm = if avg_doc_length > 0.0 {
            doc_length as f64 / avg_doc_length
        } else {
            0.0
        };
        let denominator = tf as f64 + self.k1 * (1.0 - self.b + self.b * length_norm);
        let tf_component = (tf as f64 * (self.k1 + 1.0)) / denominator;

        idf * tf_component
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexedDocument;
    use crate::memory::MemoryIndex;
    use pretty_assertions::assert_eq;

    fn doc(id: &str, tokens: &[(&str, i64)]) -> IndexedDocument {
        IndexedDocument {
            id: id.into(),
            content: id.into(),
            length: tokens.iter().map(|(_, f)| *f as usize).sum(),
            tokens: tokens.iter().map(|(t, f)| (t.to_string(), *f)).collect(),
        }
    }

    async fn two_doc_index() -> Arc<MemoryIndex> {
        let index = Arc::new(MemoryIndex::new());
        index
            .add_documents(&[
                doc("d1", &[("hello", 1), ("world", 1)]),
                doc("d2", &[("hello", 1), ("universe", 1)]),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn shared_term_scores_equal_and_positive() {
        let index = two_doc_index().await;
        let scorer = Bm25Scorer::new(1.2, 0.75, index);

        let query = vec!["hello".to_string()];
        let s1 = scorer.score(&query, "d1").await.unwrap();
        let s2 = scorer.score(&query, "d2").await.unwrap();

        assert!(s1 > 0.0);
        assert_eq!(s1, s2); // both docs have the same length and tf
    }

    #[tokio::test]
    async fn unique_term_scores_only_its_document() {
        let index = two_doc_index().await;
        let scorer = Bm25Scorer::new(1.2, 0.75, index);

        let query = vec!["world".to_string()];
        assert!(scorer.score(&query, "d1").await.unwrap() > 0.0);
        assert_eq!(scorer.score(&query, "d2").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn empty_collection_scores_zero() {
        let scorer = Bm25Scorer::new(1.2, 0.75, Arc::new(MemoryIndex::new()));
        let score = scorer.score(&["anything".to_string()], "d1").await.unwrap();
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn all_query_tokens_absent_scores_exactly_zero() {
        let index = two_doc_index().await;
        let scorer = Bm25Scorer::new(1.2, 0.75, index);
        let score = scorer
            .score(&["missing".to_string(), "terms".to_string()], "d1")
            .await
            .unwrap();
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn batch_scores_every_candidate() {
        let index = two_doc_index().await;
        let scorer = Bm25Scorer::new(1.2, 0.75, index);
        let scores = scorer
            .score_batch(
                &["hello".to_string()],
                &["d1".to_string(), "d2".to_string(), "ghost".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores["ghost"], 0.0);
    }

    #[tokio::test]
    async fn explain_names_found_and_missing_terms() {
        let index = two_doc_index().await;
        let scorer = Bm25Scorer::new(1.2, 0.75, index);
        let explanation = scorer
            .explain(&["hello".to_string(), "missing".to_string()], "d1")
            .await
            .unwrap();
        assert!(explanation.contains("'hello': tf=1"));
        assert!(explanation.contains("'missing': not found"));
    }
}
