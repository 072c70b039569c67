//! Chat-completion client for the answer-generation side of the system.
//!
//! The retrieval core never calls the LLM itself; the HTTP surface feeds it
//! the assembled prompt through the [`ChatModel`] capability.

mod client;
mod error;

pub use client::{ChatMessage, ChatModel, OllamaChat};
pub use error::LlmError;
