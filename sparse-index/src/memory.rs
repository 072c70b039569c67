use crate::error::SparseIndexError;
use crate::index::{preview_of, IndexedDocument, KeywordIndex};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    postings: HashMap<String, HashSet<String>>,
    term_freq: HashMap<(String, String), i64>,
    doc_freq: HashMap<String, i64>,
    doc_lengths: HashMap<String, i64>,
    previews: HashMap<String, String>,
    doc_count: i64,
    avg_doc_length: f64,
}

/// In-process keyword index with the same statistics semantics as the Redis
/// adapter. Used by the test suite and as a no-dependency fallback.
#[derive(Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeywordIndex for MemoryIndex {
    async fn add_documents(&self, docs: &[IndexedDocument]) -> Result<(), SparseIndexError> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;
        let old_count = inner.doc_count;
        let old_avg = inner.avg_doc_length;

        let mut total_length = 0i64;
        for doc in docs {
            inner.doc_lengths.insert(doc.id.clone(), doc.length as i64);
            inner
                .previews
                .insert(doc.id.clone(), preview_of(&doc.content).to_string());
            total_length += doc.length as i64;

            for (token, freq) in &doc.tokens {
                inner
                    .postings
                    .entry(token.clone())
                    .or_default()
                    .insert(doc.id.clone());
                inner
                    .term_freq
                    .insert((token.clone(), doc.id.clone()), *freq);
                *inner.doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let new_count = old_count + docs.len() as i64;
        inner.doc_count = new_count;
        inner.avg_doc_length =
            (old_avg * old_count as f64 + total_length as f64) / new_count as f64;
        Ok(())
    }

    async fn remove_document(&self, doc_id: &str) -> Result<(), SparseIndexError> {
        let mut inner = self.inner.write().await;
        inner.doc_lengths.remove(doc_id);
        inner.previews.remove(doc_id);
        inner.doc_count -= 1;
        Ok(())
    }

    async fn search(&self, tokens: &[String], limit: usize) -> Result<Vec<String>, SparseIndexError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().await;
        let mut union: HashSet<&String> = HashSet::new();
        for token in tokens {
            if let Some(postings) = inner.postings.get(token) {
                union.extend(postings);
            }
        }

        let mut doc_ids: Vec<String> = union.into_iter().cloned().collect();
        if limit > 0 && doc_ids.len() > limit {
            doc_ids.truncate(limit);
        }
        Ok(doc_ids)
    }

    async fn term_frequency(&self, term: &str, doc_id: &str) -> Result<i64, SparseIndexError> {
        let inner = self.inner.read().await;
        Ok(inner
            .term_freq
            .get(&(term.to_string(), doc_id.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn doc_frequency(&self, term: &str) -> Result<i64, SparseIndexError> {
        let inner = self.inner.read().await;
        Ok(inner.doc_freq.get(term).copied().unwrap_or(0))
    }

    async fn doc_count(&self) -> Result<i64, SparseIndexError> {
        Ok(self.inner.read().await.doc_count)
    }

    async fn avg_doc_length(&self) -> Result<f64, SparseIndexError> {
        Ok(self.inner.read().await.avg_doc_length)
    }

    async fn doc_length(&self, doc_id: &str) -> Result<i64, SparseIndexError> {
        let inner = self.inner.read().await;
        Ok(inner.doc_lengths.get(doc_id).copied().unwrap_or(0))
    }

    async fn documents_by_ids(
        &self,
        doc_ids: &[String],
    ) -> Result<HashMap<String, String>, SparseIndexError> {
        let inner = self.inner.read().await;
        Ok(doc_ids
            .iter()
            .filter_map(|id| inner.previews.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn clear(&self) -> Result<(), SparseIndexError> {
        *self.inner.write().await = Inner::default();
        Ok(())
    }

    async fn export(&self) -> Result<serde_json::Value, SparseIndexError> {
        let inner = self.inner.read().await;
        let mut data = serde_json::Map::new();
        for (doc_id, preview) in &inner.previews {
            data.insert(
                format!("doc:{doc_id}:content"),
                serde_json::Value::String(preview.clone()),
            );
        }
        data.insert(
            "stats:doc_count".into(),
            serde_json::Value::String(inner.doc_count.to_string()),
        );
        data.insert(
            "stats:avg_doc_length".into(),
            serde_json::Value::String(inner.avg_doc_length.to_string()),
        );
        Ok(serde_json::Value::Object(data))
    }
}
