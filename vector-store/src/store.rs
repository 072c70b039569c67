use crate::error::VectorStoreError;
use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use ragcode_domain::{ChunkType, CodeChunk, SearchResult, SearchSource};
use std::collections::HashMap;
use tracing::{debug, info};

/// Persistence capability for chunks keyed by their content id.
///
/// A chunk supersedes prior chunks for the same `file_path` atomically by
/// the caller issuing `delete_by_path` before `store`.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Upsert chunks (vector + payload) keyed by chunk id.
    async fn store(&self, chunks: &[CodeChunk]) -> Result<(), VectorStoreError>;

    /// Delete every chunk recorded under the given file path.
    async fn delete_by_path(&self, file_path: &str) -> Result<(), VectorStoreError>;

    /// Fetch a single chunk by id.
    async fn get(&self, id: &str) -> Result<CodeChunk, VectorStoreError>;

    /// Cosine-similarity k-NN over stored vectors.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, VectorStoreError>;
}

/// Qdrant-backed chunk store: one named collection, cosine distance.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Initialization(e.to_string()))?;
        Ok(Self {
            client,
            collection: collection.into(),
        })
    }

    /// Ensure the collection exists with the embedding model's dimension.
    /// Idempotent; a no-op when the collection is already present.
    pub async fn init_collection(&self, vector_size: u64) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Initialization(e.to_string()))?;
        if exists {
            return Ok(());
        }

        info!(collection = %self.collection, size = vector_size, "creating vector collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(|e| VectorStoreError::Initialization(e.to_string()))?;
        Ok(())
    }

    fn payload_for(chunk: &CodeChunk) -> HashMap<String, Value> {
        let mut payload = serde_json::json!({
            "chunk_id": chunk.id,
            "file_path": chunk.file_path,
            "language": chunk.language,
            "chunk_type": chunk.chunk_type.as_str(),
            "start_line": chunk.start_line as f64,
            "end_line": chunk.end_line as f64,
            "content": chunk.content,
        });
        if !chunk.dependencies.is_empty() {
            payload["dependencies"] = serde_json::json!(chunk.dependencies);
        }
        if !chunk.metadata.is_empty() {
            payload["metadata"] = serde_json::json!(chunk.metadata);
        }
        serde_json::from_value(payload).expect("payload map conversion")
    }

    fn chunk_from_payload(payload: &HashMap<String, Value>) -> CodeChunk {
        let mut chunk = CodeChunk::new(
            payload_str(payload, "file_path"),
            payload_str(payload, "language"),
            ChunkType::from_tag(&payload_str(payload, "chunk_type")),
            payload_str(payload, "content"),
            payload_f64(payload, "start_line") as usize,
            payload_f64(payload, "end_line") as usize,
        );
        let stored_id = payload_str(payload, "chunk_id");
        if !stored_id.is_empty() {
            chunk.id = stored_id;
        }
        if let Some(deps) = payload_list(payload, "dependencies") {
            chunk.dependencies = deps;
        }
        if let Some(meta) = payload_map(payload, "metadata") {
            chunk.metadata = meta;
        }
        chunk
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn store(&self, chunks: &[CodeChunk]) -> Result<(), VectorStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .map(|chunk| {
                PointStruct::new(
                    point_uuid(&chunk.id),
                    chunk.embedding.clone(),
                    Self::payload_for(chunk),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| VectorStoreError::Store(e.to_string()))?;

        debug!(count = chunks.len(), "stored chunks");
        Ok(())
    }

    async fn delete_by_path(&self, file_path: &str) -> Result<(), VectorStoreError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Filter::must([Condition::matches(
                        "file_path",
                        file_path.to_string(),
                    )]))
                    .wait(true),
            )
            .await
            .map_err(|e| VectorStoreError::Delete(e.to_string()))?;

        info!(path = file_path, "deleted file chunks");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CodeChunk, VectorStoreError> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![point_uuid(id).into()])
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

        let point = response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| VectorStoreError::NotFound(id.to_string()))?;

        Ok(Self::chunk_from_payload(&point.payload))
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, VectorStoreError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let chunk = Self::chunk_from_payload(&point.payload);
                SearchResult::new(chunk, point.score, SearchSource::Vector)
            })
            .collect();

        Ok(results)
    }
}

/// Chunk ids are 16 hashed bytes rendered as 32 hex characters; Qdrant point
/// ids must be UUIDs, so hyphenate into the canonical 8-4-4-4-12 form.
fn point_uuid(chunk_id: &str) -> String {
    if chunk_id.len() == 32 && chunk_id.bytes().all(|b| b.is_ascii_hexdigit()) {
        format!(
            "{}-{}-{}-{}-{}",
            &chunk_id[..8],
            &chunk_id[8..12],
            &chunk_id[12..16],
            &chunk_id[16..20],
            &chunk_id[20..]
        )
    } else {
        chunk_id.to_string()
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

fn payload_f64(payload: &HashMap<String, Value>, key: &str) -> f64 {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::DoubleValue(d)) => *d,
        Some(Kind::IntegerValue(i)) => *i as f64,
        _ => 0.0,
    }
}

fn payload_list(payload: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::ListValue(list)) => Some(
            list.values
                .iter()
                .filter_map(|v| match v.kind.as_ref() {
                    Some(Kind::StringValue(s)) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn payload_map(payload: &HashMap<String, Value>, key: &str) -> Option<HashMap<String, String>> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StructValue(st)) => Some(
            st.fields
                .iter()
                .filter_map(|(k, v)| match v.kind.as_ref() {
                    Some(Kind::StringValue(s)) => Some((k.clone(), s.clone())),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}
