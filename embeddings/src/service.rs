use crate::error::EmbeddingError;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;

/// Conservative rune budget for the embedding model. `all-minilm` accepts 512
/// tokens; 384 runes keeps every input comfortably under the limit across
/// Ollama versions.
const MAX_EMBEDDING_RUNES: usize = 384;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text → fixed-dimension vector capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts; the output order matches the input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Ollama-backed embedder with bounded parallelism.
///
/// `workers` caps concurrency inside one `embed_batch` call; the semaphore
/// caps concurrent requests across all batches process-wide.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
    workers: usize,
    semaphore: Arc<Semaphore>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create an embedder with default parallelism (4 workers, 16 in flight).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_concurrency(base_url, model, 4, 16)
    }

    /// Create an embedder with full concurrency control.
    pub fn with_concurrency(
        base_url: impl Into<String>,
        model: impl Into<String>,
        workers: usize,
        max_concurrent: usize,
    ) -> Self {
        let workers = workers.max(1);
        let max_concurrent = if max_concurrent == 0 { workers * 2 } else { max_concurrent };
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
            workers,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // Cap concurrent requests across all batches.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("embedding semaphore closed");

        let truncated = truncate_for_embedding(text);
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: &truncated,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.request_embedding(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.workers.min(texts.len());
        debug!(count = texts.len(), workers, "generating batch embeddings");

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let futures: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| async move { (index, self.request_embedding(text).await) })
            .collect();
        let mut jobs = stream::iter(futures).buffer_unordered(workers);

        while let Some((index, outcome)) = jobs.next().await {
            match outcome {
                Ok(embedding) => results[index] = Some(embedding),
                Err(e) => {
                    return Err(EmbeddingError::Batch {
                        index,
                        message: e.to_string(),
                    })
                }
            }
        }

        Ok(results
            .into_iter()
            .map(|slot| slot.expect("all batch slots filled"))
            .collect())
    }
}

/// Truncate to the model's safe rune budget at a rune boundary.
fn truncate_for_embedding(text: &str) -> String {
    if text.chars().count() <= MAX_EMBEDDING_RUNES {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_EMBEDDING_RUNES).collect();
    debug!(
        original_runes = text.chars().count(),
        truncated_runes = MAX_EMBEDDING_RUNES,
        "truncated text for embedding"
    );
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn truncation_respects_rune_boundaries() {
        let short = "short text";
        assert_eq!(truncate_for_embedding(short), short);

        let long: String = "é".repeat(500);
        let truncated = truncate_for_embedding(&long);
        assert_eq!(truncated.chars().count(), MAX_EMBEDDING_RUNES);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn embed_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new(server.uri(), "all-minilm");
        let vector = embedder.embed("fn main() {}").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_string_contains("alpha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [1.0]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_string_contains("beta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [2.0]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_string_contains("gamma"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [3.0]})))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::with_concurrency(server.uri(), "all-minilm", 3, 8);
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[tokio::test]
    async fn batch_surfaces_first_error_with_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model melted"))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::with_concurrency(server.uri(), "all-minilm", 1, 4);
        let texts = vec!["only".to_string()];
        let err = embedder.embed_batch(&texts).await.unwrap_err();
        match err {
            EmbeddingError::Batch { index, message } => {
                assert_eq!(index, 0);
                assert!(message.contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let embedder = OllamaEmbedder::new("http://localhost:0", "all-minilm");
        let vectors = embedder.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
