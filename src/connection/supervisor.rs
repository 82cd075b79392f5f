//! Reconnection supervisor
//!
//! Owns the single active transport connection and the logical connection
//! state. Lost or failed connections are retried after a fixed delay,
//! forever, until shutdown.

use super::config::LinkConfig;
use super::stats::LinkStats;
use crate::telemetry::{StateChange, TelemetryStore};
use crate::transport::{
    TransportConnection, TransportConnector, TransportEvent, TransportEventKind, TransportHandle,
};
use gcs_link_shared::codec;
use gcs_link_shared::state_machine::{LinkAction, LinkEvent, LinkStateMachine, TransitionResult};
use gcs_link_shared::{ConnectionState, Outbound};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Drives [`LinkStateMachine`] from transport events and timers
pub struct ReconnectSupervisor {
    config: LinkConfig,
    connector: Arc<dyn TransportConnector>,
    machine: LinkStateMachine,
    state_tx: watch::Sender<ConnectionState>,
    /// Handle of the active connection, published only while connected
    link_tx: watch::Sender<Option<TransportHandle>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    active: Option<TransportConnection>,
    next_connection_id: u64,
    retry_at: Option<Instant>,
    connected_since: Option<Instant>,
    store: Arc<TelemetryStore>,
    stats: Arc<LinkStats>,
}

impl ReconnectSupervisor {
    /// Create a supervisor and the receiver its connections report into
    pub fn new(
        config: LinkConfig,
        connector: Arc<dyn TransportConnector>,
        store: Arc<TelemetryStore>,
        stats: Arc<LinkStats>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            config,
            connector,
            machine: LinkStateMachine::new(),
            state_tx: watch::channel(ConnectionState::Disconnected).0,
            link_tx: watch::channel(None).0,
            events_tx,
            active: None,
            next_connection_id: 0,
            retry_at: None,
            connected_since: None,
            store,
            stats,
        };
        (supervisor, events_rx)
    }

    /// Current logical connection state
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Observe connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Observe the writable handle of the active connection
    pub fn watch_link(&self) -> watch::Receiver<Option<TransportHandle>> {
        self.link_tx.subscribe()
    }

    /// When the pending reconnect fires, if one is scheduled
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    /// When the current connection was established
    #[cfg(test)]
    pub fn connected_since(&self) -> Option<Instant> {
        self.connected_since
    }

    /// Bring the link up. No-op while connecting or connected.
    pub fn start(&mut self) {
        self.apply(LinkEvent::Start);
    }

    /// The reconnect delay elapsed
    pub fn retry_due(&mut self) {
        self.retry_at = None;
        self.apply(LinkEvent::RetryDue);
    }

    /// Cancel any pending reconnect and close the active connection
    pub fn shutdown(&mut self) {
        self.apply(LinkEvent::Shutdown);
    }

    /// Apply a transport event. Returns the message text for routing when
    /// the event is a message from the active connection.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<String> {
        let active_id = self.active.as_ref().map(TransportConnection::id);
        if active_id != Some(event.connection_id) {
            debug!(
                "[LINK] Ignoring event from stale connection {}",
                event.connection_id
            );
            return None;
        }

        match event.kind {
            TransportEventKind::Open => {
                self.apply(LinkEvent::Opened);
                None
            }
            TransportEventKind::Message(text) => Some(text),
            TransportEventKind::Close { code } => {
                self.active = None;
                info!("[LINK] Connection closed (code={:?})", code);
                self.apply(LinkEvent::Closed { code });
                None
            }
            TransportEventKind::Error(reason) => {
                self.active = None;
                warn!("[LINK] Connection error: {}", reason);
                self.store.record_error(reason.clone());
                self.apply(LinkEvent::Failed { reason });
                None
            }
        }
    }

    /// Send a keepalive ping on the active connection
    pub fn send_keepalive(&self) -> bool {
        if self.state() != ConnectionState::Connected {
            return false;
        }
        let Some(conn) = &self.active else {
            return false;
        };
        match codec::encode(&Outbound::ping()) {
            Ok(text) => conn.handle().send(text),
            Err(e) => {
                warn!("[LINK] Failed to encode ping: {}", e);
                false
            }
        }
    }

    fn apply(&mut self, event: LinkEvent) {
        let (from, to, action) = match self.machine.process_event(event) {
            TransitionResult::Success { from, to, action } => (from, to, action),
            TransitionResult::Ignored { from, event } => {
                debug!("[LINK] {:?} ignored while {}", event, from);
                return;
            }
        };

        match action {
            LinkAction::OpenTransport => self.open_transport(),
            LinkAction::ScheduleReconnect => {
                self.retry_at = Some(Instant::now() + self.config.reconnect_delay);
                info!(
                    "[LINK] Reconnecting to {} in {:?}",
                    self.config.endpoint, self.config.reconnect_delay
                );
            }
            LinkAction::CloseTransport => {
                self.retry_at = None;
                if let Some(conn) = self.active.take() {
                    conn.close();
                }
            }
            LinkAction::None => {}
        }

        if to == ConnectionState::Connected && from != ConnectionState::Connected {
            // Publish the writer before the state so a dispatcher that sees
            // `connected` always finds a handle
            self.link_tx
                .send_replace(self.active.as_ref().map(|c| c.handle().clone()));
            self.connected_since = Some(Instant::now());
            self.stats.record_connected();
        } else if to != ConnectionState::Connected {
            self.link_tx.send_replace(None);
            if let Some(since) = self.connected_since.take() {
                info!("[LINK] Connection was up for {:?}", since.elapsed());
            }
        }

        if from != to {
            info!("[LINK] {} -> {}", from, to);
            self.state_tx.send_replace(to);
            self.store.notify(StateChange::Connection(to));
        }
    }

    fn open_transport(&mut self) {
        self.retry_at = None;
        self.next_connection_id += 1;
        self.stats.record_attempt();

        info!(
            "[LINK] Connecting to {} via {} (attempt {})",
            self.config.endpoint,
            self.connector.name(),
            self.next_connection_id
        );

        self.active = Some(TransportConnection::spawn(
            self.connector.clone(),
            self.config.endpoint.clone(),
            self.next_connection_id,
            self.events_tx.clone(),
        ));
    }
}
