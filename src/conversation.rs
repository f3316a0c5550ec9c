//! Conversation transcript
//!
//! An append-only list of turns that always opens with the persona turn.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

/// Opening turn that sets the assistant's persona for the whole session
pub const PERSONA: &str = "I am a mentor and AI assistant focused on future careers, \
technologies (such as AI, Web3 and data) and social responsibility (ESG). My answers are \
professional, encouraging and focused on preparing you for the 2030+ job market.";

pub const PERSONA_TURN_ID: i64 = 0;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One message in the conversation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    id: i64,
    content: String,
    speaker: Speaker,
}

impl Turn {
    pub fn new(id: i64, content: impl Into<String>, speaker: Speaker) -> Self {
        Self {
            id,
            content: content.into(),
            speaker,
        }
    }

    pub fn user(id: i64, content: impl Into<String>) -> Self {
        Self::new(id, content, Speaker::User)
    }

    pub fn assistant(id: i64, content: impl Into<String>) -> Self {
        Self::new(id, content, Speaker::Assistant)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn is_user(&self) -> bool {
        self.speaker == Speaker::User
    }
}

/// Ordered transcript; index 0 is always the persona turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Seed a conversation with the default persona.
    pub fn new() -> Self {
        Self::with_persona(PERSONA)
    }

    pub fn with_persona(persona: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::assistant(PERSONA_TURN_ID, persona)],
        }
    }

    /// Return the conversation with `turn` at the end.
    #[must_use]
    pub fn append(mut self, turn: Turn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn persona(&self) -> &Turn {
        &self.turns[0]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Never true: the persona turn is always present.
    #[allow(dead_code)] // paired with len()
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-derived turn ids, strictly increasing within the process.
#[derive(Debug, Default)]
pub struct TurnIds {
    last: AtomicI64,
}

impl TurnIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}
