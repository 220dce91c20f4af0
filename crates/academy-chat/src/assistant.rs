//! Turn orchestration: commit the question, fold the streamed reply into the
//! conversation, and close the turn.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Transport,
    conversation::{ChatMessage, Conversation, MessageId},
    error::{TransportError, ValidationError},
    events::ChatEvent,
    handle::ChatHandle,
    prompt::APOLOGY,
};

/// How a submitted turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply streamed to the end
    Completed,
    /// The transport failed; the apology is in the transcript
    Failed,
    /// The turn was aborted through the handle
    Aborted,
}

/// The chat assistant: owns the conversation and drives one turn at a time
/// against a transport.
pub struct Assistant {
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    handle: ChatHandle,
}

impl Assistant {
    /// Create an assistant whose conversation holds only the greeting
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            conversation: Conversation::new(),
            transport,
            handle: ChatHandle::new(),
        }
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.conversation.subscribe()
    }

    /// Get the conversation
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Get all messages
    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.conversation.is_busy()
    }

    /// Get a cloneable handle for aborting from another task.
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Abort the current turn
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Run one full turn for `input`.
    ///
    /// Returns `Err` only when the input is rejected, in which case the
    /// conversation is untouched. Transport failures are recovered here and
    /// reported as [`TurnOutcome::Failed`].
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome, ValidationError> {
        let user_id = self.conversation.append_user_message(input)?;
        let text = self
            .conversation
            .message(user_id)
            .map(|m| m.text.clone())
            .unwrap_or_default();

        let cancel = self.handle.start_turn();
        let outcome = self.run_turn(&text, &cancel).await;
        self.handle.finish_turn();

        tracing::debug!(?outcome, "turn finished");
        Ok(outcome)
    }

    async fn run_turn(&mut self, text: &str, cancel: &CancellationToken) -> TurnOutcome {
        let target = self.conversation.begin_assistant_message();
        let transport = Arc::clone(&self.transport);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = transport.send(text) => Some(result),
        };
        let mut fragments = match opened {
            None => return self.abort_turn(),
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return self.fail_turn(target, &e),
        };

        let mut received = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = fragments.next() => Some(item),
            };

            match next {
                None => {
                    tracing::debug!(received, "turn aborted mid-stream");
                    return self.abort_turn();
                }
                Some(Some(Ok(fragment))) => {
                    received += 1;
                    if let Some(id) = target {
                        self.conversation.append_fragment(id, &fragment);
                    }
                }
                Some(Some(Err(e))) => return self.fail_turn(target, &e),
                Some(None) => break,
            }
        }

        self.conversation.complete_turn();
        TurnOutcome::Completed
    }

    fn fail_turn(&mut self, target: Option<MessageId>, error: &TransportError) -> TurnOutcome {
        tracing::error!(
            error = %error,
            auth = error.is_auth_failure(),
            "assistant turn failed"
        );
        self.conversation.fail_turn(target, APOLOGY);
        TurnOutcome::Failed
    }

    fn abort_turn(&mut self) -> TurnOutcome {
        self.conversation.abort_turn();
        TurnOutcome::Aborted
    }
}
