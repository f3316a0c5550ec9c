//! LLM error types

use thiserror::Error;

/// Substring the Gemini API puts in its message when the key is rejected
const INVALID_KEY_MARKER: &str = "API key not valid";

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Configuration, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Transport, message)
    }

    pub fn empty_generation(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::EmptyGeneration, message)
    }

    /// Classify a non-2xx reply by its server-supplied message, if any.
    pub fn service(message: Option<String>) -> Self {
        match message {
            Some(message) if message.contains(INVALID_KEY_MARKER) => {
                Self::new(LlmErrorKind::InvalidCredential, message)
            }
            Some(message) => Self::new(LlmErrorKind::Service, message),
            None => Self::new(LlmErrorKind::Service, "Unknown error"),
        }
    }
}

/// Error classification, one user-facing notice per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Missing or malformed credential, no request was sent
    Configuration,
    /// Connection failure or an undecodable response body
    Transport,
    /// HTTP-level failure
    Service,
    /// HTTP-level failure where the server rejected the credential
    InvalidCredential,
    /// HTTP success without any usable generated text
    EmptyGeneration,
}
