//! Handles client envelopes and builds the replies

use crate::sim::Simulation;
use gcs_link_shared::link::{CONNECT_ZEROTIER, GET_NETWORK_STATUS};
use gcs_link_shared::{codec, CodecError, Outbound, WireEnvelope};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Answers `command`, `network_command` and `ping` envelopes
pub struct CommandHandler {
    sim: Arc<Simulation>,
}

impl CommandHandler {
    pub fn new(sim: Arc<Simulation>) -> Self {
        Self { sim }
    }

    /// Handle one inbound text frame; returns the reply, if any
    pub async fn handle(&self, text: &str) -> Option<WireEnvelope> {
        let outbound = match codec::decode_outbound(text) {
            Ok(Some(outbound)) => outbound,
            Ok(None) => {
                debug!("[SIM] Ignoring envelope: {}", text);
                return None;
            }
            Err(CodecError::Json(e)) if e.is_syntax() || e.is_eof() => {
                warn!("[SIM] Invalid JSON: {}", e);
                return Some(WireEnvelope::error("Invalid JSON format"));
            }
            Err(e) => {
                warn!("[SIM] Rejected envelope: {}", e);
                return Some(WireEnvelope::error(format!("Invalid envelope: {}", e)));
            }
        };

        match outbound {
            Outbound::Command {
                command, params, ..
            } => {
                let success = self.sim.handle_command(&command, &params).await;
                Some(WireEnvelope::command_ack(command, success))
            }
            Outbound::NetworkCommand {
                command,
                network_id,
            } => match command.as_str() {
                GET_NETWORK_STATUS => Some(WireEnvelope::network_status(
                    self.sim.network_status().await,
                )),
                CONNECT_ZEROTIER => {
                    let network_id = network_id.unwrap_or_default();
                    let success = self.sim.connect_zerotier(&network_id).await;
                    Some(WireEnvelope::zerotier_connection(network_id, success))
                }
                other => {
                    debug!("[SIM] Unknown network command: {}", other);
                    None
                }
            },
            Outbound::Ping { .. } => Some(WireEnvelope::pong()),
        }
    }

    /// Envelopes sent to a client right after it connects
    pub async fn greeting(&self) -> Vec<WireEnvelope> {
        let networks = serde_json::to_value(self.sim.zerotier_networks().await)
            .unwrap_or(Value::Array(Vec::new()));

        vec![
            WireEnvelope::connection("Connected to simulated GCS endpoint")
                .with("status", Value::String("connected".into())),
            WireEnvelope::network_status(self.sim.network_status().await)
                .with("zerotier_networks", networks),
        ]
    }
}
