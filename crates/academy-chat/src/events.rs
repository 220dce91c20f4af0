//! Conversation change notifications

use serde::{Deserialize, Serialize};

use crate::conversation::{ChatMessage, MessageId};

/// Emitted after every conversation mutation so observers can re-render
/// and scroll to the latest message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was appended to the transcript
    MessageAppended { message: ChatMessage },

    /// A fragment was appended to the open assistant message
    FragmentAppended { id: MessageId, fragment: String },

    /// A message's text was replaced (failed turn)
    MessageReplaced { message: ChatMessage },

    /// An empty placeholder was dropped (aborted turn)
    MessageRemoved { id: MessageId },

    /// The busy flag flipped
    BusyChanged { busy: bool },

    /// The turn finished normally
    TurnCompleted,

    /// The turn failed and the apology is in the transcript
    TurnFailed,

    /// The turn was aborted by the caller
    TurnAborted,
}

impl ChatEvent {
    /// Check if this event ends a turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChatEvent::TurnCompleted | ChatEvent::TurnFailed | ChatEvent::TurnAborted
        )
    }
}
