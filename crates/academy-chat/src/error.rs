//! Error types for academy-chat

use thiserror::Error;

/// Why a submission was rejected before anything was appended
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Input was empty after trimming
    #[error("message is empty")]
    EmptyInput,

    /// A turn is already in flight
    #[error("a reply is still in progress")]
    Busy,
}

/// Any failure creating the session or consuming a reply stream
#[derive(Error, Debug)]
#[error(transparent)]
pub struct TransportError(#[from] academy_ai::Error);

impl TransportError {
    /// The underlying provider error
    pub fn inner(&self) -> &academy_ai::Error {
        &self.0
    }

    /// Check if the failure came from missing or rejected credentials
    pub fn is_auth_failure(&self) -> bool {
        self.0.is_auth_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_is_transparent() {
        let err = TransportError::from(academy_ai::Error::InvalidApiKey);
        assert_eq!(err.to_string(), "Invalid or missing API key");
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_transport_error_non_auth() {
        let err = TransportError::from(academy_ai::Error::Sse("reset".into()));
        assert!(!err.is_auth_failure());
        assert!(matches!(err.inner(), academy_ai::Error::Sse(_)));
    }
}
