//! Plain terminal rendering of conversation events

use std::io::{self, Write};
use std::time::Duration;

use academy_chat::{ChatEvent, ChatMessage, Role};
use tokio::sync::{broadcast, mpsc};

const THINKING: &str = "Thinking...";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Writes the transcript as it changes. Replies are streamed fragment by
/// fragment; the pending indicator is only drawn on a terminal.
pub struct Renderer<W: Write> {
    out: W,
    interactive: bool,
    thinking_shown: bool,
    streamed: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            thinking_shown: false,
            streamed: false,
        }
    }

    /// Print existing messages (the greeting on startup)
    pub fn render_transcript(&mut self, messages: &[ChatMessage]) -> io::Result<()> {
        for message in messages {
            match message.role {
                Role::User => writeln!(self.out, "> {}", message.text)?,
                Role::Assistant if message.is_error => self.write_error(&message.text)?,
                Role::Assistant => writeln!(self.out, "{}", message.text)?,
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    /// Apply one event to the screen
    pub fn handle_event(&mut self, event: &ChatEvent) -> io::Result<()> {
        match event {
            ChatEvent::MessageAppended { message } if message.role == Role::Assistant => {
                if message.is_error {
                    self.clear_thinking()?;
                    self.write_error(&message.text)?;
                } else if message.text.is_empty() && self.interactive {
                    write!(self.out, "{}", THINKING)?;
                    self.thinking_shown = true;
                }
            }
            ChatEvent::FragmentAppended { fragment, .. } => {
                self.clear_thinking()?;
                write!(self.out, "{}", fragment)?;
                self.streamed = true;
            }
            ChatEvent::MessageReplaced { message } => {
                self.clear_thinking()?;
                if self.streamed {
                    writeln!(self.out)?;
                    self.streamed = false;
                }
                self.write_error(&message.text)?;
            }
            ChatEvent::MessageRemoved { .. } => self.clear_thinking()?,
            ChatEvent::TurnCompleted => self.end_turn(None)?,
            ChatEvent::TurnAborted => self.end_turn(Some("[stopped]"))?,
            ChatEvent::TurnFailed => self.end_turn(None)?,
            _ => {}
        }
        self.out.flush()
    }

    fn end_turn(&mut self, note: Option<&str>) -> io::Result<()> {
        self.clear_thinking()?;
        if self.streamed {
            writeln!(self.out)?;
            self.streamed = false;
        }
        if let Some(note) = note {
            writeln!(self.out, "{}", note)?;
        }
        writeln!(self.out)
    }

    fn clear_thinking(&mut self) -> io::Result<()> {
        if self.thinking_shown {
            write!(self.out, "{}", CLEAR_LINE)?;
            self.thinking_shown = false;
        }
        Ok(())
    }

    fn write_error(&mut self, text: &str) -> io::Result<()> {
        if self.interactive {
            writeln!(self.out, "\x1b[31m{}\x1b[0m", text)
        } else {
            writeln!(self.out, "{}", text)
        }
    }
}

/// End-of-turn signals from the renderer task
pub struct TurnSignals {
    rx: mpsc::UnboundedReceiver<()>,
}

impl TurnSignals {
    fn new(rx: mpsc::UnboundedReceiver<()>) -> Self {
        Self { rx }
    }

    /// Drop signals left over from earlier turns. A signal that arrives
    /// after its turn's wait gave up must not end the next turn's wait.
    pub fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Wait for the renderer to draw the end of a turn.
    /// Returns `false` if it did not within `grace`.
    pub async fn wait(&mut self, grace: Duration) -> bool {
        matches!(tokio::time::timeout(grace, self.rx.recv()).await, Ok(Some(())))
    }
}

/// Render events on stdout from a background task
pub fn spawn_renderer(
    initial: Vec<ChatMessage>,
    mut events: broadcast::Receiver<ChatEvent>,
    interactive: bool,
) -> TurnSignals {
    let (turn_done_tx, turn_done_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut renderer = Renderer::new(io::stdout(), interactive);
        if let Err(e) = renderer.render_transcript(&initial) {
            tracing::warn!("failed to write transcript: {}", e);
        }

        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = renderer.handle_event(&event) {
                        tracing::warn!("failed to render event: {}", e);
                    }
                    if event.is_terminal() {
                        let _ = turn_done_tx.send(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "renderer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    TurnSignals::new(turn_done_rx)
}
