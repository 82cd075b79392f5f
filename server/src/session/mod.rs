//! Session management for tracking connected ground stations
//!
//! This module handles:
//! - Tracking all connected client sessions
//! - Per-client outbound queues
//! - Broadcast fan-out of telemetry and network status

mod connection;
mod manager;

pub use connection::SessionHandle;
pub use manager::SessionManager;
