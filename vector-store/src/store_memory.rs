use crate::error::VectorStoreError;
use crate::store::ChunkStore;
use async_trait::async_trait;
use ragcode_domain::{CodeChunk, SearchResult, SearchSource};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process chunk store with exact cosine search. Backs the test suite and
/// single-binary setups without an external vector database.
#[derive(Default)]
pub struct MemoryVectorStore {
    chunks: RwLock<HashMap<String, CodeChunk>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }
}

#[async_trait]
impl ChunkStore for MemoryVectorStore {
    async fn store(&self, chunks: &[CodeChunk]) -> Result<(), VectorStoreError> {
        let mut guard = self.chunks.write().await;
        for chunk in chunks {
            guard.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn delete_by_path(&self, file_path: &str) -> Result<(), VectorStoreError> {
        let mut guard = self.chunks.write().await;
        guard.retain(|_, chunk| chunk.file_path != file_path);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CodeChunk, VectorStoreError> {
        self.chunks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, VectorStoreError> {
        let guard = self.chunks.read().await;
        let mut scored: Vec<SearchResult> = guard
            .values()
            .filter(|chunk| !chunk.embedding.is_empty())
            .map(|chunk| {
                let score = cosine(vector, &chunk.embedding);
                SearchResult::new(chunk.clone(), score, SearchSource::Vector)
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
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
    use ragcode_domain::ChunkType;

    fn chunk_with_embedding(path: &str, content: &str, embedding: Vec<f32>) -> CodeChunk {
        let mut chunk = CodeChunk::new(path, "rust", ChunkType::Function, content, 1, 5);
        chunk.embedding = embedding;
        chunk
    }

    #[tokio::test]
    async fn store_get_delete_round_trip() {
        let store = MemoryVectorStore::new();
        let chunk = chunk_with_embedding("a.rs", "fn a() {}", vec![1.0, 0.0]);
        let id = chunk.id.clone();

        store.store(&[chunk]).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&id).await.unwrap().file_path, "a.rs");

        store.delete_by_path("a.rs").await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.get(&id).await,
            Err(VectorStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_orders_by_cosine_similarity() {
        let store = MemoryVectorStore::new();
        store
            .store(&[
                chunk_with_embedding("aligned.rs", "fn aligned() {}", vec![1.0, 0.0]),
                chunk_with_embedding("orthogonal.rs", "fn orthogonal() {}", vec![0.0, 1.0]),
                chunk_with_embedding("close.rs", "fn close() {}", vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.file_path, "aligned.rs");
        assert_eq!(results[1].chunk.file_path, "close.rs");
    }

    #[tokio::test]
    async fn delete_only_touches_the_given_path() {
        let store = MemoryVectorStore::new();
        store
            .store(&[
                chunk_with_embedding("keep.rs", "fn keep() {}", vec![1.0]),
                chunk_with_embedding("drop.rs", "fn drop_me() {}", vec![1.0]),
            ])
            .await
            .unwrap();

        store.delete_by_path("drop.rs").await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
