//! Pure state transition function

use super::{ChatContext, ChatState, Effect, Event, Notice, PersonaDelivery};
use crate::conversation::{Conversation, Turn};
use crate::llm::{LlmError, LlmMessage, LlmRequest};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is refused. A refused event changes nothing.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("Waiting for the previous reply")]
    Busy,
    #[error("Inference is not configured: {0}")]
    NotConfigured(LlmError),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Notice to raise for this refusal, if the user should see one
    pub fn notice(&self) -> Option<Notice> {
        match self {
            TransitionError::NotConfigured(error) => Some(Notice::from_llm_error(error)),
            _ => None,
        }
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
/// `conversation` is the transcript before any effect of this event.
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    conversation: &Conversation,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Submitting + UserSubmit -> refused, never queued
        (ChatState::Submitting { .. }, Event::UserSubmit { .. }) => Err(TransitionError::Busy),

        // Idle + UserSubmit -> Submitting
        (ChatState::Idle, Event::UserSubmit { text, turn_id }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            if let Some(error) = &context.credential_error {
                return Err(TransitionError::NotConfigured(error.clone()));
            }

            // Built from the pre-append transcript so the new text is sent once
            let request = build_request(context.persona_delivery, conversation, text);

            Ok(TransitionResult::new(ChatState::Submitting { turn_id })
                .with_effect(Effect::append(Turn::user(turn_id, text)))
                .with_effect(Effect::PublishState)
                .with_effect(Effect::RequestInference {
                    for_turn: turn_id,
                    request,
                }))
        }

        // Submitting + reply -> Idle with assistant turn
        (
            ChatState::Submitting { turn_id },
            Event::InferenceSucceeded {
                for_turn,
                reply_id,
                text,
            },
        ) if *turn_id == for_turn => Ok(TransitionResult::new(ChatState::Idle)
            .with_effect(Effect::append(Turn::assistant(reply_id, text)))
            .with_effect(Effect::PublishState)),

        // Submitting + failure -> Idle, user turn stays
        (ChatState::Submitting { turn_id }, Event::InferenceFailed { for_turn, error })
            if *turn_id == for_turn =>
        {
            Ok(TransitionResult::new(ChatState::Idle)
                .with_effect(Effect::notify(Notice::from_llm_error(&error)))
                .with_effect(Effect::PublishState))
        }

        (
            state,
            Event::InferenceSucceeded { for_turn, .. } | Event::InferenceFailed { for_turn, .. },
        ) => {
            Err(TransitionError::InvalidTransition(format!(
                "inference result for turn {for_turn} in state {}",
                state.name()
            )))
        }
    }
}

/// Map the transcript plus the new user text to an inference request.
pub fn build_request(
    delivery: PersonaDelivery,
    conversation: &Conversation,
    new_user_text: &str,
) -> LlmRequest {
    let (system, history) = match delivery {
        PersonaDelivery::History => (None, conversation.turns()),
        PersonaDelivery::SystemInstruction => (
            Some(conversation.persona().content().to_string()),
            &conversation.turns()[1..],
        ),
    };

    let mut messages: Vec<LlmMessage> = history.iter().map(turn_to_message).collect();
    messages.push(LlmMessage::user(new_user_text));

    LlmRequest { system, messages }
}

fn turn_to_message(turn: &Turn) -> LlmMessage {
    if turn.is_user() {
        LlmMessage::user(turn.content())
    } else {
        LlmMessage::assistant(turn.content())
    }
}
