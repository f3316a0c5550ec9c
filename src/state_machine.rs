//! Chat controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notice, NoticeLevel};
pub use event::Event;
pub use state::{ChatContext, ChatState, PersonaDelivery};
pub use transition::{transition, TransitionError};
