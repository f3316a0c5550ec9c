//! Events that can occur in a chat view

use crate::llm::LlmError;

/// Events that trigger state transitions
///
/// Ids are minted by the runtime so the transition function stays pure.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        turn_id: i64,
    },

    // Inference events
    InferenceSucceeded {
        /// User turn this reply answers
        for_turn: i64,
        reply_id: i64,
        text: String,
    },
    InferenceFailed {
        for_turn: i64,
        error: LlmError,
    },
}
