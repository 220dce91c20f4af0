//! Provider implementations

pub mod google;

use crate::{ChunkStream, Context, Error, GenerationConfig, Model, Result};
use async_trait::async_trait;

/// Environment variables consulted for the Gemini API key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Trait for chat providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stream a response for the given context
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        config: &GenerationConfig,
    ) -> Result<ChunkStream>;
}

/// Get an API key from a provided value or the first set environment variable
pub fn get_api_key(provided: Option<&str>, env_vars: &[&str]) -> Result<String> {
    if let Some(key) = provided.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or(Error::InvalidApiKey)
}
