//! Link configuration

use gcs_link_shared::link;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported endpoint {0:?}: expected ws:// or wss://")]
    UnsupportedEndpoint(String),

    #[error("Reconnect delay must be greater than zero")]
    ZeroReconnectDelay,

    #[error("Ping interval must be greater than zero (disable it instead)")]
    ZeroPingInterval,

    #[error("Subscriber capacity must be greater than zero")]
    ZeroCapacity,
}

/// Configuration for the telemetry link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Telemetry endpoint URI
    pub endpoint: String,
    /// Fixed delay between losing a connection and the next attempt
    pub reconnect_delay: Duration,
    /// Connection attempt timeout
    pub connect_timeout: Duration,
    /// Keepalive ping period while connected; `None` disables pings
    pub ping_interval: Option<Duration>,
    /// How many changes a subscriber may fall behind before it lags
    pub subscriber_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: link::DEFAULT_ENDPOINT.into(),
            reconnect_delay: Duration::from_millis(link::RECONNECT_DELAY_MS),
            connect_timeout: Duration::from_millis(link::CONNECT_TIMEOUT_MS),
            ping_interval: Some(Duration::from_millis(link::PING_INTERVAL_MS)),
            subscriber_capacity: 256,
        }
    }
}

impl LinkConfig {
    /// Check the configuration before a client is built from it
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::UnsupportedEndpoint(self.endpoint.clone()));
        }
        if self.reconnect_delay.is_zero() {
            return Err(ConfigError::ZeroReconnectDelay);
        }
        if self.ping_interval.is_some_and(|p| p.is_zero()) {
            return Err(ConfigError::ZeroPingInterval);
        }
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_millis(2000));
        assert_eq!(config.endpoint, "ws://localhost:8000/ws");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_websocket_endpoint() {
        let config = LinkConfig {
            endpoint: "http://localhost:8000".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedEndpoint(_))
        ));
    }

    #[test]
    fn test_rejects_zero_values() {
        let config = LinkConfig {
            reconnect_delay: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroReconnectDelay));

        let config = LinkConfig {
            ping_interval: Some(Duration::ZERO),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPingInterval));

        let config = LinkConfig {
            subscriber_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }
}
