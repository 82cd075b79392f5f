//! Ground-control telemetry link
//!
//! Keeps a long-lived WebSocket connection to a vehicle telemetry endpoint,
//! merges partial telemetry into a live snapshot, reconnects after a fixed
//! delay and sends operator commands while connected.

pub mod cli;
pub mod client;
pub mod command;
pub mod connection;
pub mod operator;
pub mod telemetry;
pub mod transport;

pub use client::TelemetryClient;
pub use command::{CommandDispatcher, DispatchError};
pub use connection::{ConfigError, ConnectionStats, LinkConfig};
pub use gcs_link_shared::ConnectionState;
pub use telemetry::{NetworkStatus, StateChange, TelemetrySnapshot};
