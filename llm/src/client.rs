use crate::error::LlmError;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// Generation can take a while on small local models.
const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Chat-completion capability: messages in, answer text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Ollama chat adapter. `generate` returns the full answer; `stream_generate`
/// emits partial messages through a callback as they arrive.
pub struct OllamaChat {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    done: bool,
}

impl OllamaChat {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::builder()
                .timeout(GENERATE_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Stream partial responses through `callback` until the model reports
    /// completion. The callback may abort the stream by returning an error.
    pub async fn stream_generate(
        &self,
        messages: &[ChatMessage],
        mut callback: impl FnMut(&str) -> Result<(), LlmError> + Send,
    ) -> Result<(), LlmError> {
        let response = self.send(messages, true).await?;
        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            // The stream is newline-delimited JSON objects.
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.is_empty() {
                    continue;
                }
                let parsed: ChatResponse = serde_json::from_slice(line)?;
                callback(&parsed.message.content)?;
                if parsed.done {
                    return Ok(());
                }
            }
        }

        // Trailing object without a final newline.
        if !buffer.is_empty() {
            let parsed: ChatResponse = serde_json::from_slice(&buffer)?;
            callback(&parsed.message.content)?;
        }

        Ok(())
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let response = self.send(messages, false).await?;
        let parsed: ChatResponse = response.json().await?;
        debug!(chars = parsed.message.content.len(), "chat response received");
        Ok(parsed.message.content)
    }
}
