//! Command dispatcher for sending operator commands to the vehicle

use crate::connection::LinkStats;
use crate::transport::TransportHandle;
use gcs_link_shared::{codec, ConnectionState, Outbound};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Why a command was not sent
#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("Link is {0}, not connected")]
    NotConnected(ConnectionState),

    #[error("Command name is empty")]
    EmptyCommand,

    #[error("Network id is empty")]
    EmptyNetworkId,

    #[error("Failed to encode command: {0}")]
    Encode(String),

    #[error("Transport rejected the command")]
    SendFailed,
}

/// Sends commands over the active connection.
///
/// Commands are never queued: while the link is not connected every call
/// fails immediately.
#[derive(Clone)]
pub struct CommandDispatcher {
    state: watch::Receiver<ConnectionState>,
    link: watch::Receiver<Option<TransportHandle>>,
    stats: Arc<LinkStats>,
}

impl CommandDispatcher {
    pub fn new(
        state: watch::Receiver<ConnectionState>,
        link: watch::Receiver<Option<TransportHandle>>,
        stats: Arc<LinkStats>,
    ) -> Self {
        Self { state, link, stats }
    }

    /// Send a command envelope. Returns the timestamp it was stamped with.
    pub fn try_dispatch(&self, command: &str, params: Map<String, Value>) -> Result<u64, DispatchError> {
        if command.trim().is_empty() {
            return Err(DispatchError::EmptyCommand);
        }

        let envelope = Outbound::command(command, params);
        let timestamp = match &envelope {
            Outbound::Command { timestamp, .. } => *timestamp,
            _ => 0,
        };

        self.send(&envelope)?;
        info!("[CMD] Sent {} (timestamp={})", command, timestamp);
        Ok(timestamp)
    }

    /// Send a command, logging a warning on failure
    pub fn dispatch(&self, command: &str, params: Map<String, Value>) -> bool {
        match self.try_dispatch(command, params) {
            Ok(_) => true,
            Err(e) => {
                warn!("[CMD] Cannot send {}: {}", command, e);
                false
            }
        }
    }

    /// Ask the endpoint to join a ZeroTier network
    pub fn try_dispatch_network_command(&self, network_id: &str) -> Result<(), DispatchError> {
        let network_id = network_id.trim();
        if network_id.is_empty() {
            return Err(DispatchError::EmptyNetworkId);
        }

        self.send(&Outbound::connect_zerotier(network_id))?;
        info!("[CMD] Requested ZeroTier network {}", network_id);
        Ok(())
    }

    pub fn dispatch_network_command(&self, network_id: &str) -> bool {
        match self.try_dispatch_network_command(network_id) {
            Ok(()) => true,
            Err(e) => {
                warn!("[CMD] Cannot join network {}: {}", network_id, e);
                false
            }
        }
    }

    /// Ask the endpoint for a fresh network status
    pub fn request_network_status(&self) -> bool {
        match self.send(&Outbound::get_network_status()) {
            Ok(()) => {
                debug!("[CMD] Requested network status");
                true
            }
            Err(e) => {
                warn!("[CMD] Cannot request network status: {}", e);
                false
            }
        }
    }

    fn send(&self, envelope: &Outbound) -> Result<(), DispatchError> {
        let state = *self.state.borrow();
        if state != ConnectionState::Connected {
            return Err(DispatchError::NotConnected(state));
        }

        let handle = self
            .link
            .borrow()
            .clone()
            .ok_or(DispatchError::NotConnected(state))?;

        let text = codec::encode(envelope).map_err(|e| DispatchError::Encode(e.to_string()))?;
        if !handle.send(text) {
            return Err(DispatchError::SendFailed);
        }

        self.stats.record_command();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChannelConnector, TransportConnection, TransportEventKind};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn disconnected() -> (
        CommandDispatcher,
        watch::Sender<ConnectionState>,
        watch::Sender<Option<TransportHandle>>,
    ) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (link_tx, link_rx) = watch::channel(None);
        let dispatcher = CommandDispatcher::new(state_rx, link_rx, Arc::new(LinkStats::new()));
        (dispatcher, state_tx, link_tx)
    }

    #[test]
    fn test_dispatch_while_disconnected_fails() {
        let (dispatcher, _state, _link) = disconnected();

        assert_eq!(
            dispatcher.try_dispatch("ARM", Map::new()),
            Err(DispatchError::NotConnected(ConnectionState::Disconnected))
        );
        assert!(!dispatcher.dispatch("ARM", Map::new()));
        assert!(!dispatcher.dispatch_network_command("1c33c1ced0b12345"));
        assert!(!dispatcher.request_network_status());
        assert_eq!(dispatcher.stats.snapshot().commands_sent, 0);
    }

    #[test]
    fn test_connected_state_without_link_fails() {
        let (dispatcher, state, _link) = disconnected();
        state.send_replace(ConnectionState::Connected);

        assert_eq!(
            dispatcher.try_dispatch("ARM", Map::new()),
            Err(DispatchError::NotConnected(ConnectionState::Connected))
        );
    }

    #[test]
    fn test_empty_arguments_are_rejected() {
        let (dispatcher, _state, _link) = disconnected();
        assert_eq!(
            dispatcher.try_dispatch("  ", Map::new()),
            Err(DispatchError::EmptyCommand)
        );
        assert_eq!(
            dispatcher.try_dispatch_network_command(""),
            Err(DispatchError::EmptyNetworkId)
        );
    }

    #[tokio::test]
    async fn test_dispatch_reaches_endpoint() {
        let (connector, mut acceptor) = ChannelConnector::new();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let conn = TransportConnection::spawn(
            Arc::new(connector),
            "ws://test/ws".into(),
            1,
            events_tx,
        );
        assert_eq!(events.recv().await.unwrap().kind, TransportEventKind::Open);
        let mut peer = acceptor.accept().await.unwrap();

        let (dispatcher, state, link) = disconnected();
        link.send_replace(Some(conn.handle().clone()));
        state.send_replace(ConnectionState::Connected);

        let mut params = Map::new();
        params.insert("mode".into(), json!("RTL"));
        let timestamp = dispatcher.try_dispatch("SET_MODE", params).unwrap();

        let sent: Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({
                "type": "command",
                "command": "SET_MODE",
                "params": {"mode": "RTL"},
                "timestamp": timestamp,
            })
        );

        assert!(dispatcher.dispatch_network_command("1c33c1ced0b12345"));
        let sent: Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(sent["type"], "network_command");
        assert_eq!(sent["command"], "connect_zerotier");
        assert_eq!(sent["network_id"], "1c33c1ced0b12345");

        assert!(dispatcher.request_network_status());
        let sent: Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(sent["command"], "get_network_status");

        assert_eq!(dispatcher.stats.snapshot().commands_sent, 3);
    }
}
