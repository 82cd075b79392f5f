//! GCS Link Shared Protocol Types
//!
//! This crate provides the JSON envelope types, the text codec and the
//! connection state machine shared by the telemetry link client and the
//! simulated telemetry endpoint.

pub mod codec;
pub mod envelope;
pub mod signal;
pub mod state_machine;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use codec::CodecError;
pub use envelope::{CommandAck, Inbound, Outbound, WireEnvelope};
pub use signal::SignalTier;
pub use state_machine::ConnectionState;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Link parameters shared by client and endpoint
pub mod link {
    /// Default telemetry endpoint
    pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

    /// Fixed delay before a reconnect attempt
    pub const RECONNECT_DELAY_MS: u64 = 2000;

    /// Connection attempt timeout
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;

    /// Keepalive ping interval while connected
    pub const PING_INTERVAL_MS: u64 = 10_000;

    /// Telemetry broadcast period of the endpoint (10 Hz)
    pub const TELEMETRY_PERIOD_MS: u64 = 100;

    /// Network status broadcast period of the endpoint
    pub const NETWORK_STATUS_PERIOD_MS: u64 = 10_000;

    /// Command name for joining a ZeroTier network
    pub const CONNECT_ZEROTIER: &str = "connect_zerotier";

    /// Command name for requesting a fresh network status
    pub const GET_NETWORK_STATUS: &str = "get_network_status";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_wall_clock() {
        // 2020-01-01T00:00:00Z
        assert!(now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_default_endpoint_is_websocket() {
        assert!(link::DEFAULT_ENDPOINT.starts_with("ws://"));
        assert!(link::RECONNECT_DELAY_MS > 0);
    }
}
