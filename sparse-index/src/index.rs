use crate::error::SparseIndexError;
use crate::preprocess::QueryPreprocessor;
use async_trait::async_trait;
use ragcode_domain::CodeChunk;
use std::collections::HashMap;

/// Stored length of the per-document content preview, in bytes.
pub(crate) const PREVIEW_BYTES: usize = 200;

/// Sparse-side view of a chunk: preview, token count, and term frequencies.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub id: String,
    pub content: String,
    pub length: usize,
    pub tokens: HashMap<String, i64>,
}

/// The inverted-index capability backing BM25 retrieval.
///
/// Implementations maintain, per keyspace prefix: posting sets
/// (term → doc ids), per-document term frequencies, document frequencies,
/// document lengths, a content preview, and the collection statistics
/// `doc_count` and `avg_doc_length`. Exact transactional consistency is not
/// required; eventual consistency within one ingest batch is.
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    /// Add documents in one pipelined batch, updating posting lists,
    /// frequencies, and the running collection statistics.
    async fn add_documents(&self, docs: &[IndexedDocument]) -> Result<(), SparseIndexError>;

    /// Tokenize chunks and add them to the index.
    async fn add_chunks(&self, chunks: &[CodeChunk]) -> Result<(), SparseIndexError> {
        self.add_documents(&documents_from_chunks(chunks)).await
    }

    /// Drop a document's length/preview keys and decrement the collection
    /// size. Posting entries age out on rebuild.
    async fn remove_document(&self, doc_id: &str) -> Result<(), SparseIndexError>;

    /// Union of posting lists for the tokens, capped at `limit` ids.
    /// Order within the response is unspecified.
    async fn search(&self, tokens: &[String], limit: usize) -> Result<Vec<String>, SparseIndexError>;

    async fn term_frequency(&self, term: &str, doc_id: &str) -> Result<i64, SparseIndexError>;

    async fn doc_frequency(&self, term: &str) -> Result<i64, SparseIndexError>;

    async fn doc_count(&self) -> Result<i64, SparseIndexError>;

    async fn avg_doc_length(&self) -> Result<f64, SparseIndexError>;

    async fn doc_length(&self, doc_id: &str) -> Result<i64, SparseIndexError>;

    /// Pipelined preview fetch; missing documents are omitted from the map.
    async fn documents_by_ids(
        &self,
        doc_ids: &[String],
    ) -> Result<HashMap<String, String>, SparseIndexError>;

    /// Remove every key under this index's prefix.
    async fn clear(&self) -> Result<(), SparseIndexError>;

    /// Dump the raw keyspace as JSON, for backup and debugging.
    async fn export(&self) -> Result<serde_json::Value, SparseIndexError>;
}

/// Tokenize chunk content into indexed documents using the shared
/// preprocessor, so index-time terms match query-time terms.
pub fn documents_from_chunks(chunks: &[CodeChunk]) -> Vec<IndexedDocument> {
    let preprocessor = QueryPreprocessor::new();

    chunks
        .iter()
        .map(|chunk| {
            let processed = preprocessor.preprocess(&chunk.content);
            let mut tokens: HashMap<String, i64> = HashMap::new();
            for token in &processed.tokens {
                *tokens.entry(token.clone()).or_insert(0) += 1;
            }

            IndexedDocument {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                length: processed.tokens.len(),
                tokens,
            }
        })
        .collect()
}

/// First `PREVIEW_BYTES` bytes of the content, cut at a UTF-8 boundary.
pub(crate) fn preview_of(content: &str) -> &str {
    if content.len() <= PREVIEW_BYTES {
        return content;
    }
    let mut end = PREVIEW_BYTES;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragcode_domain::ChunkType;

    #[test]
    fn documents_carry_term_frequencies() {
        let chunk = CodeChunk::new(
            "calc.rs",
            "rust",
            ChunkType::Function,
            "fn add(a: i64, b: i64) -> i64 { add_inner(a, b) }",
            1,
            1,
        );
        let docs = documents_from_chunks(std::slice::from_ref(&chunk));
        assert_eq!(docs.len(), 1);

        let doc = &docs[0];
        assert_eq!(doc.id, chunk.id);
        // "add" appears in `add` and `add_inner` (split to add + inner).
        assert_eq!(doc.tokens.get("add"), Some(&2));
        assert!(doc.length > 0);
    }

    #[test]
    fn preview_respects_utf8() {
        let content = "é".repeat(150); // 300 bytes
        let preview = preview_of(&content);
        assert!(preview.len() <= PREVIEW_BYTES);
        assert!(preview.chars().all(|c| c == 'é'));
    }
}
