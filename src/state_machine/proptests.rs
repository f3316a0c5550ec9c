//! Property-based tests for the state machine
//!
//! Random event sequences are driven through `transition`, applying the
//! append effects the way the runtime does, and the conversation invariants
//! are checked after every step.

use super::state::*;
use super::transition::*;
use super::*;
use crate::conversation::{Conversation, Turn, PERSONA};
use crate::llm::{LlmError, LlmErrorKind};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Configuration),
        Just(LlmErrorKind::Transport),
        Just(LlmErrorKind::Service),
        Just(LlmErrorKind::InvalidCredential),
        Just(LlmErrorKind::EmptyGeneration),
    ]
}

/// Abstract step; ids are filled in by the driver
#[derive(Debug, Clone)]
enum Step {
    Submit(String),
    Reply(String),
    Fail(LlmErrorKind),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => prop_oneof!["[a-zA-Z ?]{1,30}", "[ \t\n]{0,3}"].prop_map(Step::Submit),
        2 => "[a-zA-Z .]{1,30}".prop_map(Step::Reply),
        2 => arb_error_kind().prop_map(Step::Fail),
    ]
}

fn arb_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::Idle),
        (1i64..1000).prop_map(|turn_id| ChatState::Submitting { turn_id }),
    ]
}

fn arb_delivery() -> impl Strategy<Value = PersonaDelivery> {
    prop_oneof![
        Just(PersonaDelivery::History),
        Just(PersonaDelivery::SystemInstruction),
    ]
}

// ============================================================================
// Driver
// ============================================================================

struct Model {
    state: ChatState,
    conversation: Conversation,
    next_id: i64,
}

impl Model {
    fn new() -> Self {
        Self {
            state: ChatState::Idle,
            conversation: Conversation::new(),
            next_id: 1,
        }
    }

    fn event_for(&mut self, step: &Step) -> Event {
        let id = self.next_id;
        self.next_id += 1;
        let for_turn = match self.state {
            ChatState::Submitting { turn_id } => turn_id,
            ChatState::Idle => 0,
        };
        match step {
            Step::Submit(text) => Event::UserSubmit {
                text: text.clone(),
                turn_id: id,
            },
            Step::Reply(text) => Event::InferenceSucceeded {
                for_turn,
                reply_id: id,
                text: text.clone(),
            },
            Step::Fail(kind) => Event::InferenceFailed {
                for_turn,
                error: LlmError::new(*kind, "failure"),
            },
        }
    }

    fn apply(&mut self, result: TransitionResult) {
        self.state = result.new_state;
        for effect in result.effects {
            if let Effect::AppendTurn { turn } = effect {
                self.conversation = std::mem::take(&mut self.conversation).append(turn);
            }
        }
    }
}

fn count_appends(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::AppendTurn { .. }))
        .count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Persona is never touched and refused events never change anything
    #[test]
    fn prop_sequences_preserve_invariants(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let context = ChatContext::default();
        let mut model = Model::new();

        for step in &steps {
            let event = model.event_for(step);
            let before_len = model.conversation.len();
            let before_state = model.state;

            match transition(&model.state, &context, &model.conversation, event) {
                Ok(result) => {
                    match (&before_state, step) {
                        (ChatState::Idle, Step::Submit(_)) => {
                            prop_assert!(result.new_state.is_busy());
                            prop_assert_eq!(count_appends(&result.effects), 1);
                        }
                        (ChatState::Submitting { .. }, Step::Reply(_)) => {
                            prop_assert_eq!(result.new_state, ChatState::Idle);
                            prop_assert_eq!(count_appends(&result.effects), 1);
                        }
                        (ChatState::Submitting { .. }, Step::Fail(_)) => {
                            prop_assert_eq!(result.new_state, ChatState::Idle);
                            prop_assert_eq!(count_appends(&result.effects), 0);
                        }
                        _ => prop_assert!(false, "unexpected success for {:?}", step),
                    }
                    model.apply(result);
                }
                Err(_) => {
                    prop_assert_eq!(model.conversation.len(), before_len);
                    prop_assert_eq!(model.state, before_state);
                }
            }

            prop_assert_eq!(model.conversation.persona(), &Turn::assistant(0, PERSONA));
        }
    }

    /// A full round-trip grows the transcript by two (success) or one (failure)
    #[test]
    fn prop_round_trip_growth(
        text in "[a-zA-Z]{1,20}",
        reply in "[a-zA-Z]{1,20}",
        fail in proptest::option::of(arb_error_kind()),
    ) {
        let context = ChatContext::default();
        let mut model = Model::new();
        let start = model.conversation.len();

        let event = model.event_for(&Step::Submit(text.clone()));
        let result = transition(&model.state, &context, &model.conversation, event).unwrap();
        model.apply(result);
        prop_assert_eq!(model.conversation.len(), start + 1);

        let step = match fail {
            Some(kind) => Step::Fail(kind),
            None => Step::Reply(reply.clone()),
        };
        let event = model.event_for(&step);
        let result = transition(&model.state, &context, &model.conversation, event).unwrap();
        model.apply(result);

        prop_assert_eq!(model.state, ChatState::Idle);
        let turns = model.conversation.turns();
        prop_assert_eq!(turns[start].content(), text.as_str());
        prop_assert!(turns[start].is_user());
        if fail.is_some() {
            prop_assert_eq!(turns.len(), start + 1);
        } else {
            prop_assert_eq!(turns.len(), start + 2);
            prop_assert_eq!(turns[start + 1].content(), reply.as_str());
            prop_assert!(!turns[start + 1].is_user());
        }
    }

    /// Busy state refuses every submission
    #[test]
    fn prop_submitting_refuses_submit(turn_id in 1i64..1000, text in ".{0,30}") {
        let conv = Conversation::new();
        let result = transition(
            &ChatState::Submitting { turn_id },
            &ChatContext::default(),
            &conv,
            Event::UserSubmit { text, turn_id: turn_id + 1 },
        );
        prop_assert!(matches!(result, Err(TransitionError::Busy)));
    }

    /// Missing credential refuses before any append or request
    #[test]
    fn prop_unconfigured_never_requests(text in "[a-zA-Z]{1,20}", state in arb_state()) {
        let context = ChatContext::new(
            Err(LlmError::configuration("missing")),
            PersonaDelivery::History,
        );
        let result = transition(
            &state,
            &context,
            &Conversation::new(),
            Event::UserSubmit { text, turn_id: 5000 },
        );
        let err = result.unwrap_err();
        match state {
            ChatState::Idle => prop_assert!(err.notice().is_some()),
            ChatState::Submitting { .. } => prop_assert!(matches!(err, TransitionError::Busy)),
        }
    }

    /// Same inputs, same effects
    #[test]
    fn prop_transition_is_deterministic(
        history in proptest::collection::vec(("[a-z]{1,10}", any::<bool>()), 0..8),
        text in "[a-z]{1,10}",
        delivery in arb_delivery(),
    ) {
        let mut conv = Conversation::new();
        for (i, (content, is_user)) in history.into_iter().enumerate() {
            let id = i64::try_from(i).unwrap() + 1;
            conv = conv.append(if is_user {
                Turn::user(id, content)
            } else {
                Turn::assistant(id, content)
            });
        }
        let context = ChatContext::new(Ok(()), delivery);
        let event = Event::UserSubmit { text, turn_id: 100 };

        let first = transition(&ChatState::Idle, &context, &conv, event.clone()).unwrap();
        let second = transition(&ChatState::Idle, &context, &conv, event).unwrap();
        prop_assert_eq!(first.new_state, second.new_state);
        prop_assert_eq!(first.effects, second.effects);
    }

    /// The request carries the pre-append transcript plus the new text once
    #[test]
    fn prop_request_matches_transcript(
        history in proptest::collection::vec("[a-z]{1,10}", 0..8),
        text in "[a-z]{1,10}",
    ) {
        let mut conv = Conversation::new();
        for (i, content) in history.iter().enumerate() {
            conv = conv.append(Turn::user(i64::try_from(i).unwrap() + 1, content.clone()));
        }
        let result = transition(
            &ChatState::Idle,
            &ChatContext::default(),
            &conv,
            Event::UserSubmit { text: text.clone(), turn_id: 100 },
        )
        .unwrap();

        let request = result.effects.iter().find_map(|e| match e {
            Effect::RequestInference { request, .. } => Some(request.clone()),
            _ => None,
        });
        let request = request.unwrap();
        prop_assert_eq!(request.messages.len(), conv.len() + 1);
        prop_assert_eq!(request.messages[0].text.as_str(), PERSONA);
        prop_assert_eq!(request.messages.last().map(|m| m.text.as_str()), Some(text.as_str()));
        prop_assert_eq!(
            request.messages.iter().filter(|m| m.text == text).count(),
            1 + history.iter().filter(|h| **h == text).count()
        );
    }
}
