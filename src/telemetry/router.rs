//! Message Router
//!
//! Parses each inbound text message and applies it to the store. A message
//! that cannot be parsed is dropped on its own; the connection is untouched.

use super::snapshot::{MergeReport, NetworkStatus};
use super::store::{StateChange, TelemetryStore};
use crate::connection::LinkStats;
use gcs_link_shared::{codec, Inbound};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the router did with one message
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Telemetry merged
    Telemetry(MergeReport),
    /// Network status replaced
    NetworkStatus,
    /// Informational envelope published (connection, ack, network result, pong)
    Published(&'static str),
    /// Endpoint reported an error
    EndpointError,
    /// Well-formed but nothing to apply
    Ignored(String),
    /// Malformed; dropped
    Dropped(String),
}

/// Routes inbound envelopes to their state sink
pub struct MessageRouter {
    store: Arc<TelemetryStore>,
    stats: Arc<LinkStats>,
}

impl MessageRouter {
    pub fn new(store: Arc<TelemetryStore>, stats: Arc<LinkStats>) -> Self {
        Self { store, stats }
    }

    /// Route one raw inbound message
    pub fn route(&self, raw: &str) -> RouteOutcome {
        self.stats.record_message();

        let inbound = match codec::decode(raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                let reason = format!("Malformed message dropped: {}", e);
                warn!("[ROUTER] {}", reason);
                self.stats.record_malformed();
                self.store.record_error(reason.clone());
                return RouteOutcome::Dropped(reason);
            }
        };

        debug!("[ROUTER] Received: {}", inbound.kind());

        match inbound {
            Inbound::Telemetry(Value::Object(data)) => {
                let report = self.store.merge_telemetry(&data);
                if !report.skipped.is_empty() {
                    debug!("[ROUTER] Skipped non-scalar telemetry fields: {:?}", report.skipped);
                }
                RouteOutcome::Telemetry(report)
            }
            Inbound::NetworkStatus(Value::Object(data)) => {
                self.store.replace_network_status(NetworkStatus::from_data(&data));
                RouteOutcome::NetworkStatus
            }
            Inbound::Telemetry(_) => without_data("telemetry"),
            Inbound::NetworkStatus(_) => without_data("network_status"),
            Inbound::Connection { message } => {
                let message = message.unwrap_or_default();
                info!("[ROUTER] Endpoint: {}", message);
                self.store.notify(StateChange::Notice(message));
                RouteOutcome::Published("connection")
            }
            Inbound::CommandAck(ack) => {
                info!(
                    "[ROUTER] Command result: {} success={:?}",
                    ack.command.as_deref().unwrap_or("?"),
                    ack.success
                );
                self.store.notify(StateChange::CommandAck(ack));
                RouteOutcome::Published("command_ack")
            }
            Inbound::NetworkCommandResult { network_id, success } => {
                info!(
                    "[ROUTER] Network command result: network={} success={}",
                    network_id.as_deref().unwrap_or("?"),
                    success
                );
                self.store
                    .notify(StateChange::NetworkCommandResult { network_id, success });
                RouteOutcome::Published("zerotier_connection")
            }
            Inbound::Error { message } => {
                let message = message.unwrap_or_else(|| "unspecified endpoint error".into());
                warn!("[ROUTER] Endpoint error: {}", message);
                self.store.record_error(message);
                RouteOutcome::EndpointError
            }
            Inbound::Pong => {
                self.stats.record_pong();
                RouteOutcome::Published("pong")
            }
            Inbound::Unknown(kind) => {
                debug!("[ROUTER] Ignoring unknown envelope type: {}", kind);
                RouteOutcome::Ignored(kind)
            }
        }
    }
}

fn without_data(kind: &str) -> RouteOutcome {
    warn!("[ROUTER] {} envelope without a data object ignored", kind);
    RouteOutcome::Ignored(kind.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> (MessageRouter, Arc<TelemetryStore>, Arc<LinkStats>) {
        let store = Arc::new(TelemetryStore::default());
        let stats = Arc::new(LinkStats::new());
        (MessageRouter::new(store.clone(), stats.clone()), store, stats)
    }

    #[test]
    fn test_battery_remaining_scenario() {
        let (router, store, _) = router();
        router.route(r#"{"type":"telemetry","data":{"battery_remaining":42.0}}"#);
        assert_eq!(store.telemetry().battery_remaining(), Some(42.0));
    }

    #[test]
    fn test_partial_updates_do_not_erase_fields() {
        let (router, store, _) = router();
        router.route(r#"{"type":"telemetry","data":{"alt":100.0,"armed":true}}"#);
        router.route(r#"{"type":"telemetry","data":{"alt":101.5}}"#);

        let snapshot = store.telemetry();
        assert_eq!(snapshot.altitude(), Some(101.5));
        assert_eq!(snapshot.armed(), Some(true));
    }

    #[test]
    fn test_network_status_latency_scenario() {
        let (router, store, _) = router();
        router.route(r#"{"type":"network_status","data":{"latency":"80","vpn_status":"connected"}}"#);
        router.route(r#"{"type":"network_status","data":{"latency":"30"}}"#);

        let status = store.network_status();
        assert_eq!(
            status.get("latency"),
            Some(&crate::telemetry::FieldValue::Text("30".into()))
        );
        assert_eq!(status.vpn_status(), None);
    }

    #[test]
    fn test_non_json_leaves_state_unchanged() {
        let (router, store, stats) = router();
        router.route(r#"{"type":"telemetry","data":{"alt":100.0}}"#);
        router.route(r#"{"type":"network_status","data":{"latency":45}}"#);
        let telemetry_before = store.telemetry();
        let network_before = store.network_status();

        let outcome = router.route("this is not json");

        assert!(matches!(outcome, RouteOutcome::Dropped(_)));
        assert_eq!(store.telemetry(), telemetry_before);
        assert_eq!(store.network_status(), network_before);
        assert!(store.last_error().is_some());
        assert_eq!(stats.snapshot().malformed_messages, 1);
        assert_eq!(stats.snapshot().messages_received, 3);
    }

    #[test]
    fn test_missing_type_is_dropped() {
        let (router, store, _) = router();
        let outcome = router.route(r#"{"data":{"alt":1.0}}"#);
        assert!(matches!(outcome, RouteOutcome::Dropped(_)));
        assert!(store.telemetry().is_empty());
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let (router, store, stats) = router();
        let outcome = router.route(r#"{"type":"video_frame","data":{"alt":1.0}}"#);
        assert_eq!(outcome, RouteOutcome::Ignored("video_frame".into()));
        assert!(store.telemetry().is_empty());
        assert_eq!(store.last_error(), None);
        assert_eq!(stats.snapshot().malformed_messages, 0);
    }

    #[test]
    fn test_telemetry_without_object_data_is_ignored() {
        let (router, store, _) = router();
        router.route(r#"{"type":"telemetry","data":{"alt":3.0}}"#);
        let outcome = router.route(r#"{"type":"telemetry","data":[1,2]}"#);
        assert_eq!(outcome, RouteOutcome::Ignored("telemetry".into()));
        assert_eq!(store.telemetry().altitude(), Some(3.0));
    }

    #[test]
    fn test_command_ack_is_published() {
        let (router, store, _) = router();
        let mut rx = store.subscribe();

        router.route(r#"{"type":"command_ack","command":"ARM","success":true}"#);

        match rx.try_recv().unwrap() {
            StateChange::CommandAck(ack) => {
                assert_eq!(ack.command.as_deref(), Some("ARM"));
                assert_eq!(ack.success, Some(true));
            }
            other => panic!("unexpected change: {:?}", other),
        }
    }

    #[test]
    fn test_connection_message_is_a_notice() {
        let (router, store, _) = router();
        let mut rx = store.subscribe();

        let outcome = router.route(r#"{"type":"connection","message":"Connected to GCS"}"#);
        assert_eq!(outcome, RouteOutcome::Published("connection"));
        assert_eq!(rx.try_recv().unwrap(), StateChange::Notice("Connected to GCS".into()));
        assert!(store.telemetry().is_empty());
    }

    #[test]
    fn test_endpoint_error_recorded() {
        let (router, store, _) = router();
        router.route(r#"{"type":"error","message":"Invalid JSON format"}"#);
        assert_eq!(store.last_error().as_deref(), Some("Invalid JSON format"));
    }

    #[test]
    fn test_pong_updates_stats() {
        let (router, _, stats) = router();
        router.route(r#"{"type":"pong","timestamp":1700000000.5}"#);
        assert!(stats.snapshot().last_pong_at_ms.is_some());
    }

    #[test]
    fn test_zerotier_result_published() {
        let (router, store, _) = router();
        let mut rx = store.subscribe();
        router.route(r#"{"type":"zerotier_connection","network_id":"abc","success":false}"#);
        assert_eq!(
            rx.try_recv().unwrap(),
            StateChange::NetworkCommandResult {
                network_id: Some("abc".into()),
                success: false
            }
        );
    }
}
