//! academy-chat: conversation state and streaming turns for the admissions
//! assistant
//!
//! The [`Conversation`] holds the transcript the UI renders from, the
//! [`StreamingClient`] turns a question into a stream of reply fragments, and
//! the [`Assistant`] drives one turn at a time between them.

pub mod assistant;
pub mod client;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod prompt;
pub mod session;

pub use assistant::{Assistant, TurnOutcome};
pub use client::{FragmentStream, StreamingClient, Transport};
pub use conversation::{ChatMessage, Conversation, MessageId, Role, TurnPhase};
pub use error::{TransportError, ValidationError};
pub use events::ChatEvent;
pub use handle::ChatHandle;
pub use prompt::{APOLOGY, GREETING, SYSTEM_INSTRUCTION, SessionSettings};
pub use session::ChatSession;
