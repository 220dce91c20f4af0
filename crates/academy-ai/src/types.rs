//! Core types for Gemini requests

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for the assistant
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

/// Speaker of one turn in a Gemini conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used in `contents[].role`
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry of conversation history sent to the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub id: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Model {
    /// Create a model served from the default endpoint
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: HashMap::new(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ID)
    }
}

/// Sampling settings applied to every request of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
}

/// Everything needed to build one `streamGenerateContent` request
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// System instruction
    pub system_instruction: Option<String>,
    /// Prior turns followed by the new user turn
    pub turns: Vec<Turn>,
}

impl Context {
    /// Create a new context with a system instruction
    pub fn with_system(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: Some(system_instruction.into()),
            turns: vec![],
        }
    }

    /// Add a turn to the context
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}
