//! Streaming client: turns one user message into a lazy stream of text
//! fragments over a lazily created, reused session.

use std::{pin::Pin, sync::Arc};

use academy_ai::{
    ChunkStream,
    providers::{API_KEY_ENV_VARS, ChatProvider, get_api_key, google::GoogleProvider},
};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::OnceCell;
use tokio_stream::Stream;

use crate::{error::TransportError, prompt::SessionSettings, session::ChatSession};

/// Non-empty reply fragments in emission order. An `Err` item ends the stream;
/// fragments yielded before it remain valid.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Source of reply fragments for one user message
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the committed user text and return the reply as a fragment stream
    async fn send(&self, text: &str) -> Result<FragmentStream, TransportError>;
}

type Connector = Box<dyn Fn() -> academy_ai::Result<Arc<dyn ChatProvider>> + Send + Sync>;

/// Transport backed by a chat session that is created on first send and
/// reused for every later turn.
pub struct StreamingClient {
    connect: Connector,
    settings: SessionSettings,
    session: OnceCell<ChatSession>,
}

impl StreamingClient {
    /// Create a client that builds its provider with `connect` on first send
    pub fn new(
        settings: SessionSettings,
        connect: impl Fn() -> academy_ai::Result<Arc<dyn ChatProvider>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            connect: Box::new(connect),
            settings,
            session: OnceCell::new(),
        }
    }

    /// Create a client for the Gemini API. The key is resolved when the
    /// session is created, so a missing key fails the first turn rather than
    /// construction.
    pub fn gemini(settings: SessionSettings, api_key: Option<String>) -> Self {
        Self::gemini_with_env_vars(settings, api_key, API_KEY_ENV_VARS)
    }

    /// Gemini client whose fallback key comes from `env_vars`
    pub(crate) fn gemini_with_env_vars(
        settings: SessionSettings,
        api_key: Option<String>,
        env_vars: &'static [&'static str],
    ) -> Self {
        Self::new(settings, move || {
            let provider = GoogleProvider::new(get_api_key(api_key.as_deref(), env_vars)?);
            Ok(Arc::new(provider) as Arc<dyn ChatProvider>)
        })
    }

    /// Whether the session has been created yet
    pub fn has_session(&self) -> bool {
        self.session.initialized()
    }

    /// Get the session, creating it on first use. A failed creation is not
    /// cached; the next call tries again.
    pub async fn session(&self) -> Result<&ChatSession, TransportError> {
        self.session
            .get_or_try_init(|| async {
                let provider = (self.connect)()?;
                let session = ChatSession::new(provider, &self.settings);
                tracing::debug!(model = %session.model().id, "chat session created");
                Ok::<_, TransportError>(session)
            })
            .await
    }
}

#[async_trait]
impl Transport for StreamingClient {
    async fn send(&self, text: &str) -> Result<FragmentStream, TransportError> {
        let session = self.session().await?;
        let chunks = session.send_message_stream(text).await?;
        Ok(into_fragments(chunks))
    }
}

/// Keep only chunks that carry text
fn into_fragments(chunks: ChunkStream) -> FragmentStream {
    Box::pin(chunks.filter_map(|item| async move {
        match item {
            Ok(chunk) => chunk.text.filter(|t| !t.is_empty()).map(Ok),
            Err(e) => Some(Err(TransportError::from(e))),
        }
    }))
}
