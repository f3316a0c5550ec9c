//! Chat runtime executor

use super::traits::{LlmClient, Notifier};
use super::{ChatSnapshot, ChatUpdate, Inbound};

use crate::conversation::{Conversation, TurnIds};
use crate::llm::LlmRequest;
use crate::state_machine::{transition, ChatContext, ChatState, Effect, Event, TransitionError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Generic chat runtime that can work with any inference client and notifier
pub struct ChatRuntime<L, N>
where
    L: LlmClient + 'static,
    N: Notifier + 'static,
{
    context: ChatContext,
    state: ChatState,
    conversation: Conversation,
    llm_client: Arc<L>,
    notifier: N,
    turn_ids: TurnIds,
    inbox_rx: mpsc::Receiver<Inbound>,
    /// Handed to inference tasks so they can report back
    inbox_tx: mpsc::Sender<Inbound>,
    updates_tx: broadcast::Sender<ChatUpdate>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    unmount: CancellationToken,
}

impl<L, N> ChatRuntime<L, N>
where
    L: LlmClient + 'static,
    N: Notifier + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        context: ChatContext,
        conversation: Conversation,
        llm_client: L,
        notifier: N,
        inbox_rx: mpsc::Receiver<Inbound>,
        inbox_tx: mpsc::Sender<Inbound>,
        updates_tx: broadcast::Sender<ChatUpdate>,
        snapshot_tx: watch::Sender<ChatSnapshot>,
        unmount: CancellationToken,
    ) -> Self {
        Self {
            context,
            state: ChatState::Idle,
            conversation,
            llm_client: Arc::new(llm_client),
            notifier,
            turn_ids: TurnIds::new(),
            inbox_rx,
            inbox_tx,
            updates_tx,
            snapshot_tx,
            unmount,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(model = %self.llm_client.model_id(), "Chat view mounted");

        loop {
            tokio::select! {
                biased;
                () = self.unmount.cancelled() => break,
                Some(inbound) = self.inbox_rx.recv() => self.handle(inbound),
                else => break,
            }
        }

        if self.state.is_busy() {
            tracing::debug!("Unmounted with a reply in flight; it will be discarded");
        }
        tracing::info!(turns = self.conversation.len(), "Chat view unmounted");
    }

    fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Submit { text, ack } => {
                let turn_id = self.turn_ids.next();
                let result = self.process_event(Event::UserSubmit { text, turn_id });
                // Submitter may have gone away; the turn is recorded either way
                let _ = ack.send(result);
            }
            Inbound::InferenceDone { for_turn, result } => {
                let event = match result {
                    Ok(response) => Event::InferenceSucceeded {
                        for_turn,
                        reply_id: self.turn_ids.next(),
                        text: response.text,
                    },
                    Err(error) => Event::InferenceFailed { for_turn, error },
                };
                if let Err(e) = self.process_event(event) {
                    tracing::warn!(error = %e, "Dropped inference result");
                }
            }
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Pure state transition
        let result = match transition(&self.state, &self.context, &self.conversation, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, state = self.state.name(), "Event refused");
                if let Some(notice) = e.notice() {
                    self.notifier.notify(&notice);
                }
                return Err(e);
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.snapshot_tx.send_replace(ChatSnapshot {
            state: self.state,
            conversation: self.conversation.clone(),
        });

        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendTurn { turn } => {
                tracing::debug!(turn_id = turn.id(), speaker = ?turn.speaker(), "Turn appended");
                self.conversation = std::mem::take(&mut self.conversation).append(turn.clone());
                let _ = self.updates_tx.send(ChatUpdate::TurnAppended { turn });
            }

            Effect::RequestInference { for_turn, request } => {
                self.spawn_inference(for_turn, request);
            }

            Effect::Notify { notice } => {
                self.notifier.notify(&notice);
            }

            Effect::PublishState => {
                tracing::debug!(state = self.state.name(), "State changed");
                let _ = self
                    .updates_tx
                    .send(ChatUpdate::StateChanged { state: self.state });
            }
        }
    }

    /// One attempt, no timeout, no cancellation.
    fn spawn_inference(&self, for_turn: i64, request: LlmRequest) {
        let llm_client = self.llm_client.clone();
        let inbox_tx = self.inbox_tx.clone();

        tokio::spawn(async move {
            let result = llm_client.complete(&request).await;
            if inbox_tx
                .send(Inbound::InferenceDone { for_turn, result })
                .await
                .is_err()
            {
                tracing::debug!(for_turn, "Chat view gone, discarding inference result");
            }
        });
    }
}
