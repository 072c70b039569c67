use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of an error, used to decide retry policy and HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; reported to the caller, never retried
    Validation,
    /// Requested entity absent; not retried
    NotFound,
    /// Communication failure with an external service; retried where policy allows
    External,
    /// Invariant violation or encode/decode failure; surfaced
    Internal,
}

/// Error produced by the shared validation helpers and job registry.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}
