//! Command-line and environment settings for the monitor binary

use crate::connection::LinkConfig;
use clap::Parser;
use gcs_link_shared::link;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gcs-link", about = "Monitor and command a vehicle over the GCS telemetry link")]
pub struct Cli {
    /// Telemetry endpoint URI
    #[arg(env = "GCS_LINK_ENDPOINT", default_value = link::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Delay before reconnecting after the link drops, in ms
    #[arg(long, env = "GCS_RECONNECT_MS", default_value_t = link::RECONNECT_DELAY_MS)]
    pub reconnect_ms: u64,

    /// Keepalive ping period in ms; 0 disables pings
    #[arg(long, env = "GCS_PING_MS", default_value_t = link::PING_INTERVAL_MS)]
    pub ping_ms: u64,

    /// Give up on a connection attempt after this many ms
    #[arg(long, env = "GCS_CONNECT_TIMEOUT_MS", default_value_t = link::CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
}

impl Cli {
    /// Link configuration for these settings; still needs `validate()`
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            endpoint: self.endpoint.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ping_interval: (self.ping_ms > 0).then(|| Duration::from_millis(self.ping_ms)),
            ..LinkConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConfigError;

    #[test]
    fn test_explicit_arguments() {
        let cli = Cli::try_parse_from([
            "gcs-link",
            "wss://gcs.example.net/ws",
            "--reconnect-ms",
            "500",
            "--ping-ms",
            "0",
            "--connect-timeout-ms",
            "1500",
        ])
        .unwrap();
        let config = cli.link_config();

        assert_eq!(config.endpoint, "wss://gcs.example.net/ws");
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.ping_interval, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_numeric_delay_is_rejected() {
        assert!(Cli::try_parse_from(["gcs-link", "--reconnect-ms", "soon"]).is_err());
    }

    #[test]
    fn test_zero_delay_fails_validation() {
        let cli = Cli::try_parse_from(["gcs-link", "ws://127.0.0.1:8000/ws", "--reconnect-ms", "0"])
            .unwrap();
        assert_eq!(
            cli.link_config().validate(),
            Err(ConfigError::ZeroReconnectDelay)
        );
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
