//! Runtime for a mounted chat view
//!
//! One task per view owns the conversation and processes events in order.
//! Inference calls run as spawned tasks and report back to that task.

mod executor;
pub mod traits;


pub use executor::ChatRuntime;
pub use traits::*;

use crate::conversation::{Conversation, Turn};
use crate::llm::{LlmError, LlmResponse};
use crate::state_machine::{ChatContext, ChatState, TransitionError};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Messages delivered to the runtime task
#[derive(Debug)]
pub(crate) enum Inbound {
    Submit {
        text: String,
        ack: oneshot::Sender<Result<(), TransitionError>>,
    },
    InferenceDone {
        for_turn: i64,
        result: Result<LlmResponse, LlmError>,
    },
}

/// Incremental updates for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    TurnAppended { turn: Turn },
    StateChanged { state: ChatState },
}

/// Consistent view of the controller after the last processed event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub state: ChatState,
    pub conversation: Conversation,
}

/// Errors returned to the submitter
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Chat view is no longer mounted")]
    Unmounted,
}

/// Handle to interact with a mounted chat view. Dropping it unmounts the view
/// and discards the conversation.
pub struct ChatHandle {
    inbox_tx: mpsc::Sender<Inbound>,
    updates_tx: broadcast::Sender<ChatUpdate>,
    snapshot_rx: watch::Receiver<ChatSnapshot>,
    _unmount: DropGuard,
}

impl ChatHandle {
    /// Submit user text. Returns once the user turn is in the conversation
    /// (or the submission was refused); the reply arrives later.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), ChatError> {
        let (ack, ack_rx) = oneshot::channel();
        self.inbox_tx
            .send(Inbound::Submit {
                text: text.into(),
                ack,
            })
            .await
            .map_err(|_| ChatError::Unmounted)?;
        ack_rx.await.map_err(|_| ChatError::Unmounted)??;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait until no inference call is in flight.
    #[cfg(test)]
    pub async fn wait_until_idle(&mut self) -> Result<ChatSnapshot, ChatError> {
        let snapshot = self
            .snapshot_rx
            .wait_for(|s| !s.state.is_busy())
            .await
            .map_err(|_| ChatError::Unmounted)?;
        Ok(snapshot.clone())
    }

    /// Unmount explicitly; equivalent to dropping the handle.
    pub fn unmount(self) {
        drop(self);
    }
}

/// Mount a chat view: seed a conversation with the persona and start its
/// runtime task.
pub fn mount<L, N>(context: ChatContext, llm_client: L, notifier: N) -> ChatHandle
where
    L: LlmClient + 'static,
    N: Notifier + 'static,
{
    mount_with(context, Conversation::new(), llm_client, notifier)
}

pub fn mount_with<L, N>(
    context: ChatContext,
    conversation: Conversation,
    llm_client: L,
    notifier: N,
) -> ChatHandle
where
    L: LlmClient + 'static,
    N: Notifier + 'static,
{
    let (inbox_tx, inbox_rx) = mpsc::channel(32);
    let (updates_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(ChatSnapshot {
        state: ChatState::Idle,
        conversation: conversation.clone(),
    });
    let unmount = CancellationToken::new();

    let runtime = ChatRuntime::new(
        context,
        conversation,
        llm_client,
        notifier,
        inbox_rx,
        inbox_tx.clone(),
        updates_tx.clone(),
        snapshot_tx,
        unmount.clone(),
    );
    tokio::spawn(runtime.run());

    ChatHandle {
        inbox_tx,
        updates_tx,
        snapshot_rx,
        _unmount: unmount.drop_guard(),
    }
}
