//! Conversation store: the transcript, the open reply, and the busy flag.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{error::ValidationError, events::ChatEvent, prompt::GREETING};

/// Stable identifier for one message in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Chat speaker role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One bubble in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub timestamp: i64,
}

impl ChatMessage {
    fn new(id: MessageId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            is_error: false,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Where the current turn is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in flight; input is accepted
    #[default]
    Idle,
    /// User message committed, no fragment received yet
    AwaitingFirstFragment,
    /// At least one fragment folded into the open reply
    Streaming,
}

/// Ordered transcript plus turn state.
///
/// All mutations go through this type and each one is broadcast as a
/// [`ChatEvent`]. At most one assistant message is open at a time.
pub struct Conversation {
    messages: Vec<ChatMessage>,
    open: Option<MessageId>,
    phase: TurnPhase,
    next_id: u64,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a conversation holding only the greeting
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let mut conversation = Self {
            messages: Vec::new(),
            open: None,
            phase: TurnPhase::Idle,
            next_id: 0,
            event_tx,
        };
        let id = conversation.allocate_id();
        conversation
            .messages
            .push(ChatMessage::new(id, Role::Assistant, GREETING));
        conversation
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// The transcript in insertion order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Look up a message by id
    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The assistant message currently receiving fragments
    pub fn open_message(&self) -> Option<&ChatMessage> {
        self.open.and_then(|id| self.message(id))
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// Current turn phase
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Commit the user's text and mark the conversation busy.
    ///
    /// Rejects without mutating anything if the trimmed text is empty or a
    /// turn is already in flight.
    pub fn append_user_message(&mut self, text: &str) -> Result<MessageId, ValidationError> {
        if self.is_busy() {
            return Err(ValidationError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        let id = self.allocate_id();
        let message = ChatMessage::new(id, Role::User, text);
        self.messages.push(message.clone());
        self.phase = TurnPhase::AwaitingFirstFragment;
        self.emit(ChatEvent::MessageAppended { message });
        self.emit(ChatEvent::BusyChanged { busy: true });
        Ok(id)
    }

    /// Append the empty assistant message that fragments will be folded into.
    ///
    /// Returns `None` if no turn is in flight or a reply is already open.
    pub fn begin_assistant_message(&mut self) -> Option<MessageId> {
        if !self.is_busy() || self.open.is_some() {
            tracing::warn!(phase = ?self.phase, "begin_assistant_message outside of a fresh turn");
            return None;
        }

        let id = self.allocate_id();
        let message = ChatMessage::new(id, Role::Assistant, "");
        self.messages.push(message.clone());
        self.open = Some(id);
        self.emit(ChatEvent::MessageAppended { message });
        Some(id)
    }

    /// Fold a fragment into the open reply. No-op unless `target` is the open
    /// assistant message. Returns whether anything changed.
    pub fn append_fragment(&mut self, target: MessageId, fragment: &str) -> bool {
        if self.open != Some(target) || fragment.is_empty() {
            return false;
        }
        let Some(message) = self.messages.iter_mut().find(|m| m.id == target) else {
            return false;
        };

        message.text.push_str(fragment);
        self.phase = TurnPhase::Streaming;
        self.emit(ChatEvent::FragmentAppended {
            id: target,
            fragment: fragment.to_string(),
        });
        true
    }

    /// Close the turn normally. Idempotent.
    pub fn complete_turn(&mut self) {
        if !self.is_busy() {
            return;
        }
        self.finish_turn();
        self.emit(ChatEvent::TurnCompleted);
    }

    /// Close the turn with an error message. Idempotent.
    ///
    /// If `target` is the open reply its text is replaced (any partial text
    /// is discarded); otherwise a new error message is appended.
    pub fn fail_turn(&mut self, target: Option<MessageId>, text: &str) {
        if !self.is_busy() {
            return;
        }

        let open = target.filter(|id| self.open == Some(*id));
        let replaced = open.and_then(|id| self.messages.iter_mut().find(|m| m.id == id));
        match replaced {
            Some(message) => {
                message.text = text.to_string();
                message.is_error = true;
                let message = message.clone();
                self.emit(ChatEvent::MessageReplaced { message });
            }
            None => {
                let id = self.allocate_id();
                let mut message = ChatMessage::new(id, Role::Assistant, text);
                message.is_error = true;
                self.messages.push(message.clone());
                self.emit(ChatEvent::MessageAppended { message });
            }
        }

        self.finish_turn();
        self.emit(ChatEvent::TurnFailed);
    }

    /// Close the turn because the caller stopped pulling. Text already
    /// received stays; an empty placeholder is dropped. Idempotent.
    pub fn abort_turn(&mut self) {
        if !self.is_busy() {
            return;
        }

        if let Some(id) = self.open {
            let empty = self.message(id).is_some_and(|m| m.text.is_empty());
            if empty {
                self.messages.retain(|m| m.id != id);
                self.emit(ChatEvent::MessageRemoved { id });
            }
        }

        self.finish_turn();
        self.emit(ChatEvent::TurnAborted);
    }

    fn finish_turn(&mut self) {
        self.open = None;
        self.phase = TurnPhase::Idle;
        self.emit(ChatEvent::BusyChanged { busy: false });
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }
}
