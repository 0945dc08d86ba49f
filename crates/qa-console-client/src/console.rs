//! The console controller: one struct wiring the push channel, the HTTP
//! gateway, the run registry and a surface.

use qa_console_core::{
    ConsoleSurface, QaForm, Result, RunId, RunRegistry, SubmissionAck, push_channel_url,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::connection::{ChannelEvent, ConnectionManager};
use crate::dispatcher::dispatch;
use crate::gateway::QaGateway;

/// A live QA console bound to one server and one surface.
pub struct QaConsole<S: ConsoleSurface> {
    connection: ConnectionManager,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    gateway: QaGateway,
    registry: RunRegistry,
    surface: S,
}

impl<S: ConsoleSurface> QaConsole<S> {
    pub fn new(base_url: &str, surface: S) -> Result<Self> {
        Self::with_urls(base_url, &push_channel_url(base_url)?, surface)
    }

    /// Wire the HTTP endpoints and the push channel separately, for hosts
    /// where the channel is not served from the page URL.
    pub fn with_urls(base_url: &str, channel_url: &str, surface: S) -> Result<Self> {
        let gateway = QaGateway::new(base_url)?;
        let (connection, events) = ConnectionManager::new(channel_url)?;
        Ok(Self {
            connection,
            events,
            gateway,
            registry: RunRegistry::new(),
            surface,
        })
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn gateway(&self) -> &QaGateway {
        &self.gateway
    }

    /// The user-initiated start action: revive the push channel if needed,
    /// POST the form snapshot and apply the ack.
    ///
    /// A channel that cannot be opened is logged and not fatal; the
    /// submission still goes out and the ack still applies, exactly as the
    /// original page behaves when its socket is gone.
    pub async fn start(&mut self, form: &QaForm) -> Result<SubmissionAck> {
        if let Err(error) = self.connection.ensure_connected().await {
            warn!(%error, "push channel unavailable; submitting anyway");
        }

        let ack = self.gateway.submit(form).await?;
        match &ack {
            SubmissionAck::Run(id) => self.registry.begin(&mut self.surface, id.clone()),
            SubmissionAck::AlreadyRunning => self.registry.mark_running(&mut self.surface),
            SubmissionAck::Idle => debug!("submission acked idle; nothing to track"),
        }
        Ok(ack)
    }

    /// Next channel event, if the channel is still producing them.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// Apply one channel event to the run state.
    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Frame(raw) => dispatch(&raw, &mut self.registry, &mut self.surface),
            ChannelEvent::Opened => debug!("push channel opened"),
            ChannelEvent::Closed => debug!("push channel closed"),
        }
    }

    /// Drain channel events until the tracked run leaves the active state.
    ///
    /// Returns the result summary when the run completed, or `None` when
    /// the channel closed first (the run keeps going server-side).
    pub async fn follow_to_completion(&mut self) -> Option<String> {
        while self.registry.is_active() {
            match self.next_event().await? {
                ChannelEvent::Closed => {
                    self.apply(ChannelEvent::Closed);
                    return None;
                }
                event => self.apply(event),
            }
        }
        self.registry.last_result().map(ToString::to_string)
    }

    /// Fetch and display the run's debug info.
    ///
    /// The region is created next to the run's header on first load and its
    /// content replaced on every later load; the fetched text also lands in
    /// the record's cache. Failures are scoped to this run.
    pub async fn load_debug(&mut self, id: &RunId) -> Result<()> {
        let text = self.gateway.fetch_debug(id).await?;
        self.registry.cache_debug(id, &text);
        self.surface.replace_debug_region(id, &text);
        Ok(())
    }

    /// Drop the push channel (page going away).
    pub async fn shutdown(&mut self) {
        self.connection.disconnect().await;
    }
}
