//! Push-channel connection management.
//!
//! One physical channel per console, owned exclusively here; everything
//! else observes `ChannelEvent`s. Reconnection is entirely reactive: only
//! the next start action calls `ensure_connected`, never a timer, and
//! nothing is buffered while disconnected.

use std::sync::Arc;

use futures_util::StreamExt;
use qa_console_core::{ClientError, Result};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

/// Channel readiness; only `Connecting | Open` are worth reusing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn is_reusable(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Externally observable channel events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    /// One inbound text frame, classification deferred to the dispatcher.
    Frame(String),
    Closed,
}

/// Owns the single push-channel handle.
pub struct ConnectionManager {
    url: Url,
    state: Arc<RwLock<ReadyState>>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    recv_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl ConnectionManager {
    /// Create a manager for the given ws(s) URL together with the receiver
    /// the dispatcher drains.
    pub fn new(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>)> {
        let parsed = Url::parse(url).map_err(|error| ClientError::InvalidUrl(error.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "push channel URL must use ws:// or wss://, got: {}",
                parsed.scheme()
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            url: parsed,
            state: Arc::new(RwLock::new(ReadyState::Closed)),
            events_tx,
            recv_task: Arc::new(Mutex::new(None)),
        };
        Ok((manager, events_rx))
    }

    pub async fn state(&self) -> ReadyState {
        *self.state.read().await
    }

    /// Make sure a usable channel exists: reuse one in `Connecting | Open`,
    /// otherwise open a fresh connection and start the reader task.
    pub async fn ensure_connected(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.is_reusable() {
                return Ok(());
            }
            *state = ReadyState::Connecting;
        }

        let connected = connect_async(self.url.as_str()).await;
        let (stream, _response) = match connected {
            Ok(connected) => connected,
            Err(error) => {
                *self.state.write().await = ReadyState::Closed;
                return Err(ClientError::Network(error.to_string()));
            }
        };

        *self.state.write().await = ReadyState::Open;
        debug!(url = %self.url, "push channel opened");
        let _ = self.events_tx.send(ChannelEvent::Opened);

        let events_tx = self.events_tx.clone();
        let state = Arc::clone(&self.state);
        let url = self.url.to_string();
        let task = tokio::spawn(async move {
            let mut reader = stream;
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if events_tx.send(ChannelEvent::Frame(text)).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Frame(_)) => {}
                    Err(error) => {
                        warn!(url = %url, %error, "push channel read error");
                        break;
                    }
                }
            }

            // Frames arriving past this point are dropped.
            *state.write().await = ReadyState::Closed;
            let _ = events_tx.send(ChannelEvent::Closed);
            debug!(url = %url, "push channel closed");
        });

        if let Some(stale) = self.recv_task.lock().await.replace(task) {
            stale.abort();
        }
        Ok(())
    }

    /// Drop the channel and stop the reader task.
    pub async fn disconnect(&self) {
        *self.state.write().await = ReadyState::Closing;
        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
        }
        *self.state.write().await = ReadyState::Closed;
    }
}
