use thiserror::Error;

/// Errors from the chat model adapter.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat service returned status {status}: {body}")]
    Service { status: u16, body: String },

    #[error("failed to decode chat stream: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream callback failed: {0}")]
    Callback(String),
}
