//! Effects produced by state transitions

use crate::conversation::Turn;
use crate::llm::{LlmError, LlmErrorKind, LlmRequest};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a turn to the conversation
    AppendTurn { turn: Turn },

    /// Issue one inference call (spawned as a background task)
    RequestInference { for_turn: i64, request: LlmRequest },

    /// Show a notice to the user
    Notify { notice: Notice },

    /// Tell the presentation layer the state changed
    PublishState,
}

impl Effect {
    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn { turn }
    }

    pub fn notify(notice: Notice) -> Self {
        Effect::Notify { notice }
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, body)
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, body)
    }

    /// One notice per failure kind
    pub fn from_llm_error(error: &LlmError) -> Self {
        match error.kind {
            LlmErrorKind::Configuration => Self::error(
                "API key missing",
                "The Gemini API key is missing or incomplete.",
            ),
            LlmErrorKind::InvalidCredential => Self::error(
                "Invalid API key",
                "Your Gemini key is not valid. Generate a new one.",
            ),
            LlmErrorKind::Service => {
                Self::error("AI error", format!("API failure: {}", error.message))
            }
            LlmErrorKind::Transport => Self::error(
                "Connection error",
                "A network or processing error occurred.",
            ),
            LlmErrorKind::EmptyGeneration => Self::new(
                NoticeLevel::Warning,
                "No response",
                "The AI could not generate a text response.",
            ),
        }
    }
}
