//! Connection management for the persistent endpoint link
//!
//! This module handles:
//! - Link configuration and validation
//! - Automatic reconnection with a fixed delay
//! - Link statistics

mod config;
mod stats;
mod supervisor;

pub use config::{ConfigError, LinkConfig};
pub use stats::{ConnectionStats, LinkStats};
pub use supervisor::ReconnectSupervisor;
