//! Streaming chunk types and utilities

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    MaxTokens,
    /// Blocked by safety filters
    Safety,
    /// Blocked for recitation
    Recitation,
    /// Anything else the API reports
    Other,
}

impl FinishReason {
    /// Map the API's `finishReason` string
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            _ => FinishReason::Other,
        }
    }
}

/// One decoded response chunk. Chunks may carry no text at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseChunk {
    pub text: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl ResponseChunk {
    /// Create a text-only chunk
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: None,
        }
    }

    /// Text of this chunk if it carries any
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Check if this chunk ends the response
    pub fn is_final(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// A stream of response chunks. An `Err` item ends the stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ResponseChunk>> + Send>>;

/// Accumulates the full reply text from streamed chunks
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    text: String,
    finish_reason: Option<FinishReason>,
}

impl ReplyBuilder {
    /// Create a new reply builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a chunk into the reply
    pub fn process_chunk(&mut self, chunk: &ResponseChunk) {
        if let Some(text) = chunk.non_empty_text() {
            self.text.push_str(text);
        }
        if chunk.finish_reason.is_some() {
            self.finish_reason = chunk.finish_reason;
        }
    }

    /// Finish reason, if one was reported
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Consume the builder and return the reply text
    pub fn build(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_skipped() {
        let chunk = ResponseChunk {
            text: Some(String::new()),
            finish_reason: None,
        };
        assert_eq!(chunk.non_empty_text(), None);
        assert_eq!(ResponseChunk::default().non_empty_text(), None);
    }

    #[test]
    fn test_reply_builder_accumulates_in_order() {
        let mut builder = ReplyBuilder::new();
        builder.process_chunk(&ResponseChunk::text("Tuition is "));
        builder.process_chunk(&ResponseChunk::default());
        builder.process_chunk(&ResponseChunk {
            text: Some("$25,000 per year.".into()),
            finish_reason: Some(FinishReason::Stop),
        });
        assert_eq!(builder.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(builder.build(), "Tuition is $25,000 per year.");
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_api("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_api("MAX_TOKENS"), FinishReason::MaxTokens);
        assert_eq!(FinishReason::from_api("SAFETY"), FinishReason::Safety);
        assert_eq!(FinishReason::from_api("BLOCKLIST"), FinishReason::Other);
    }
}
