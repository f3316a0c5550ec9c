//! Property-based tests for the Gemini translation layer
//!
//! - Every message becomes exactly one content unit, in order
//! - Roles map user -> "user", assistant -> "model"
//! - The request body is a pure function of the request
//! - Any response without usable text is an empty generation, never a panic

use super::gemini::{GeminiCandidate, GeminiContent, GeminiPart, GeminiResponse, GeminiService};
use super::types::{LlmMessage, LlmRequest, MessageRole};
use super::LlmErrorKind;
use proptest::prelude::*;

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (any::<bool>(), "[a-zA-Z0-9 _.!?,\n]{0,80}").prop_map(|(is_user, text)| {
        if is_user {
            LlmMessage::user(text)
        } else {
            LlmMessage::assistant(text)
        }
    })
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::option::of("[a-zA-Z ]{1,40}"),
        proptest::collection::vec(arb_message(), 1..12),
    )
        .prop_map(|(system, messages)| LlmRequest { system, messages })
}

fn arb_part() -> impl Strategy<Value = GeminiPart> {
    proptest::option::of("[ \t\n]{0,5}|[a-zA-Z ]{0,20}").prop_map(|text| GeminiPart { text })
}

fn arb_response() -> impl Strategy<Value = GeminiResponse> {
    proptest::collection::vec(
        proptest::option::of(proptest::collection::vec(arb_part(), 0..3)).prop_map(|parts| {
            GeminiCandidate {
                content: parts.map(|parts| GeminiContent { role: None, parts }),
            }
        }),
        0..3,
    )
    .prop_map(|candidates| GeminiResponse {
        candidates,
        usage_metadata: None,
    })
}

proptest! {
    #[test]
    fn translation_preserves_order_and_roles(request in arb_request()) {
        let translated = GeminiService::translate_request(&request);
        prop_assert_eq!(translated.contents.len(), request.messages.len());
        for (content, msg) in translated.contents.iter().zip(&request.messages) {
            let expected = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            prop_assert_eq!(content.role.as_deref(), Some(expected));
            prop_assert_eq!(content.parts.len(), 1);
            prop_assert_eq!(content.parts[0].text.as_deref(), Some(msg.text.as_str()));
        }
        prop_assert_eq!(translated.system_instruction.is_some(), request.system.is_some());
    }

    #[test]
    fn request_body_is_deterministic(request in arb_request()) {
        let first = GeminiService::request_body(&request).unwrap();
        let second = GeminiService::request_body(&request.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn normalize_never_returns_blank_text(resp in arb_response()) {
        let first_text = resp
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        match GeminiService::normalize_response(resp) {
            Ok(out) => {
                prop_assert!(!out.text.is_empty());
                prop_assert_eq!(out.text, first_text);
            }
            Err(e) => {
                prop_assert_eq!(e.kind, LlmErrorKind::EmptyGeneration);
                prop_assert!(first_text.is_empty());
            }
        }
    }
}
