//! The session handle: one remote conversation context and its history.

use std::sync::Arc;

use academy_ai::{
    ChunkStream, Context, GenerationConfig, Model, Turn,
    providers::ChatProvider,
    stream::ReplyBuilder,
};
use async_stream::stream;
use futures::StreamExt;
use parking_lot::Mutex;

use crate::prompt::SessionSettings;

/// A chat session bound to one provider, model, system instruction and
/// temperature.
///
/// The Gemini endpoint is stateless, so the session keeps every completed
/// exchange and resends it with each new message. Only exchanges whose
/// stream ran to the end are recorded.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    model: Model,
    system_instruction: String,
    generation: GenerationConfig,
    history: Arc<Mutex<Vec<Turn>>>,
}

impl ChatSession {
    /// Create a session with an empty history
    pub fn new(provider: Arc<dyn ChatProvider>, settings: &SessionSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            system_instruction: settings.system_instruction.clone(),
            generation: settings.generation.clone(),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Model this session talks to
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Completed exchanges so far
    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().clone()
    }

    /// Send one user message and stream the reply chunks.
    ///
    /// The exchange is appended to the history when the returned stream is
    /// drained without error. Dropping the stream early records nothing.
    pub async fn send_message_stream(&self, text: &str) -> academy_ai::Result<ChunkStream> {
        let mut context = Context::with_system(self.system_instruction.clone());
        context.turns = self.history();
        context.push(Turn::user(text));

        let mut chunks = self
            .provider
            .stream(&self.model, &context, &self.generation)
            .await?;

        let history = Arc::clone(&self.history);
        let user_text = text.to_string();

        Ok(Box::pin(stream! {
            let mut builder = ReplyBuilder::new();
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        builder.process_chunk(&chunk);
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            tracing::debug!(finish_reason = ?builder.finish_reason(), "reply stream ended");
            let reply = builder.build();
            if !reply.is_empty() {
                let mut history = history.lock();
                history.push(Turn::user(user_text));
                history.push(Turn::model(reply));
            }
        }))
    }
}
