//! academy-ai: Gemini provider layer for the admissions assistant
//!
//! This crate speaks the Generative Language `streamGenerateContent` API and
//! exposes each response as a stream of text chunks.

pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use stream::{ChunkStream, ResponseChunk};
pub use types::*;
