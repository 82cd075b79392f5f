//! Wire envelopes exchanged over the telemetry link
//!
//! Every message is a JSON object carrying a `type` discriminator:
//! ```text
//! { "type": "telemetry" | "network_status" | "connection" | "command_ack" | ...,
//!   "data": { ... },          // telemetry / network_status
//!   "message": "..." }        // connection / error
//! ```

use crate::now_ms;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope as emitted by a telemetry endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Any additional top-level members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireEnvelope {
    /// Create an empty envelope of the given type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: None,
            message: None,
            extra: Map::new(),
        }
    }

    /// Partial telemetry update
    pub fn telemetry(data: Map<String, Value>) -> Self {
        Self::new("telemetry").with_data(data)
    }

    /// Full network status (replaces the previous one on the client)
    pub fn network_status(data: Map<String, Value>) -> Self {
        Self::new("network_status").with_data(data)
    }

    /// Informational connection notice
    pub fn connection(message: impl Into<String>) -> Self {
        let mut env = Self::new("connection");
        env.message = Some(message.into());
        env
    }

    /// Advisory command acknowledgment
    pub fn command_ack(command: impl Into<String>, success: bool) -> Self {
        Self::new("command_ack")
            .with("command", Value::String(command.into()))
            .with("success", Value::Bool(success))
            .with("timestamp", seconds_now())
    }

    /// Result of a network command
    pub fn zerotier_connection(network_id: impl Into<String>, success: bool) -> Self {
        Self::new("zerotier_connection")
            .with("network_id", Value::String(network_id.into()))
            .with("success", Value::Bool(success))
    }

    /// Endpoint-side error report
    pub fn error(message: impl Into<String>) -> Self {
        let mut env = Self::new("error");
        env.message = Some(message.into());
        env
    }

    /// Keepalive reply
    pub fn pong() -> Self {
        Self::new("pong").with("timestamp", seconds_now())
    }

    /// Attach a `data` object
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(Value::Object(data));
        self
    }

    /// Attach an extra top-level member
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

/// Wall-clock seconds as a JSON number (endpoint timestamps are fractional seconds)
fn seconds_now() -> Value {
    serde_json::Number::from_f64(now_ms() as f64 / 1000.0)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Advisory acknowledgment of a previously dispatched command.
///
/// Not correlated with the dispatch that caused it; fields are whatever the
/// endpoint chose to send.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandAck {
    pub command: Option<String>,
    pub success: Option<bool>,
    pub timestamp: Option<f64>,
    pub message: Option<String>,
}

/// A decoded inbound envelope, classified by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Partial telemetry update; `data` as received
    Telemetry(Value),
    /// Whole network status; `data` as received
    NetworkStatus(Value),
    /// Informational connection notice
    Connection { message: Option<String> },
    /// Advisory command acknowledgment
    CommandAck(CommandAck),
    /// Result of a `network_command`
    NetworkCommandResult {
        network_id: Option<String>,
        success: bool,
    },
    /// Error reported by the endpoint
    Error { message: Option<String> },
    /// Keepalive reply
    Pong,
    /// A type this client does not understand
    Unknown(String),
}

impl Inbound {
    /// The wire `type` this envelope was classified from
    pub fn kind(&self) -> &str {
        match self {
            Inbound::Telemetry(_) => "telemetry",
            Inbound::NetworkStatus(_) => "network_status",
            Inbound::Connection { .. } => "connection",
            Inbound::CommandAck(_) => "command_ack",
            Inbound::NetworkCommandResult { .. } => "zerotier_connection",
            Inbound::Error { .. } => "error",
            Inbound::Pong => "pong",
            Inbound::Unknown(kind) => kind,
        }
    }

    /// Classify a JSON object by its `type` member
    pub(crate) fn classify(kind: &str, obj: &Map<String, Value>) -> Self {
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let data = || obj.get("data").cloned().unwrap_or(Value::Null);

        match kind {
            "telemetry" => Inbound::Telemetry(data()),
            "network_status" => Inbound::NetworkStatus(data()),
            "connection" => Inbound::Connection {
                message: text("message"),
            },
            "command_ack" => Inbound::CommandAck(CommandAck {
                command: text("command"),
                success: obj.get("success").and_then(Value::as_bool),
                timestamp: obj.get("timestamp").and_then(Value::as_f64),
                message: text("message"),
            }),
            "zerotier_connection" => Inbound::NetworkCommandResult {
                network_id: text("network_id"),
                success: obj.get("success").and_then(Value::as_bool).unwrap_or(false),
            },
            "error" => Inbound::Error {
                message: text("message"),
            },
            "pong" => Inbound::Pong,
            other => Inbound::Unknown(other.to_string()),
        }
    }
}

/// Envelopes sent by the client to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Operator command, fire-and-forget
    Command {
        command: String,
        #[serde(default)]
        params: Map<String, Value>,
        #[serde(default)]
        timestamp: u64,
    },
    /// VPN / network management command
    NetworkCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network_id: Option<String>,
    },
    /// Keepalive ping
    Ping {
        #[serde(default)]
        timestamp: u64,
    },
}

impl Outbound {
    /// Wire `type` values this enum covers
    pub const KINDS: [&'static str; 3] = ["command", "network_command", "ping"];

    /// Build a command envelope stamped with the current wall-clock time
    pub fn command(command: impl Into<String>, params: Map<String, Value>) -> Self {
        Outbound::Command {
            command: command.into(),
            params,
            timestamp: now_ms(),
        }
    }

    /// Join a ZeroTier network
    pub fn connect_zerotier(network_id: impl Into<String>) -> Self {
        Outbound::NetworkCommand {
            command: crate::link::CONNECT_ZEROTIER.to_string(),
            network_id: Some(network_id.into()),
        }
    }

    /// Ask the endpoint for a fresh network status
    pub fn get_network_status() -> Self {
        Outbound::NetworkCommand {
            command: crate::link::GET_NETWORK_STATUS.to_string(),
            network_id: None,
        }
    }

    /// Keepalive ping stamped with the current time
    pub fn ping() -> Self {
        Outbound::Ping { timestamp: now_ms() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_envelope_shape() {
        let mut params = Map::new();
        params.insert("mode".into(), json!("RTL"));
        let cmd = Outbound::command("SET_MODE", params);

        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["command"], "SET_MODE");
        assert_eq!(value["params"]["mode"], "RTL");
        assert!(value["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_zerotier_envelope_shape() {
        let value = serde_json::to_value(Outbound::connect_zerotier("1c33c1ced0b12345")).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "network_command",
                "command": "connect_zerotier",
                "network_id": "1c33c1ced0b12345"
            })
        );
    }

    #[test]
    fn test_network_status_request_omits_network_id() {
        let value = serde_json::to_value(Outbound::get_network_status()).unwrap();
        assert!(value.get("network_id").is_none());
        assert_eq!(value["command"], "get_network_status");
    }

    #[test]
    fn test_wire_envelope_flattens_extra_members() {
        let env = WireEnvelope::command_ack("ARM", true);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "command_ack");
        assert_eq!(value["command"], "ARM");
        assert_eq!(value["success"], true);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_classify_command_ack_tolerates_missing_fields() {
        let obj = json!({"type": "command_ack"});
        let inbound = Inbound::classify("command_ack", obj.as_object().unwrap());
        assert_eq!(inbound, Inbound::CommandAck(CommandAck::default()));
    }
}
