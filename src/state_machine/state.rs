//! Chat controller state types

use crate::llm::LlmError;
use serde::Serialize;

/// Controller state. `Submitting` is the only concurrency guard: while an
/// inference call is in flight every new submission is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatState {
    #[default]
    Idle,
    Submitting {
        /// Id of the user turn awaiting a reply
        turn_id: i64,
    },
}

impl ChatState {
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatState::Submitting { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::Submitting { .. } => "submitting",
        }
    }
}

/// Where the persona turn travels in an inference request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersonaDelivery {
    /// Resent as the first model-authored history entry on every call
    #[default]
    History,
    /// Sent through the endpoint's dedicated system-instruction field
    SystemInstruction,
}

impl PersonaDelivery {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "history" => Some(Self::History),
            "system" | "system_instruction" => Some(Self::SystemInstruction),
            _ => None,
        }
    }
}

/// Fixed facts a chat view is mounted with
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    /// Set when the inference credential failed its precondition check
    pub credential_error: Option<LlmError>,
    pub persona_delivery: PersonaDelivery,
}

impl ChatContext {
    pub fn new(credential_check: Result<(), LlmError>, persona_delivery: PersonaDelivery) -> Self {
        Self {
            credential_error: credential_check.err(),
            persona_delivery,
        }
    }
}
