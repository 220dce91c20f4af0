//! Error types for academy-ai

use thiserror::Error;

/// Result type alias using academy-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Gemini API
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Check if this error means the credentials were missing or rejected
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Error::Auth(_) | Error::InvalidApiKey => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("unauthenticated")
                    || et.contains("permission_denied")
                    || msg.contains("api key not valid")
                    || msg.contains("api_key_invalid")
            }
            _ => false,
        }
    }
}
