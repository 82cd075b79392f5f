//! Link counters, accumulated for the lifetime of the process

use gcs_link_shared::now_ms;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters updated by the event loop and the dispatcher
#[derive(Debug, Default)]
pub struct LinkStats {
    messages_received: AtomicU64,
    malformed_messages: AtomicU64,
    connect_attempts: AtomicU64,
    connections: AtomicU64,
    commands_sent: AtomicU64,
    last_connected_ms: AtomicU64,
    last_pong_ms: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub messages_received: u64,
    pub malformed_messages: u64,
    pub connect_attempts: u64,
    pub connections: u64,
    pub commands_sent: u64,
    /// Wall-clock ms of the last successful connection
    pub last_connected_at_ms: Option<u64>,
    /// Wall-clock ms of the last keepalive reply
    pub last_pong_at_ms: Option<u64>,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_malformed(&self) {
        self.malformed_messages.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_connected(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
        self.last_connected_ms.store(now_ms(), Ordering::SeqCst);
    }

    pub fn record_command(&self) {
        self.commands_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_pong(&self) {
        self.last_pong_ms.store(now_ms(), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ConnectionStats {
        let nonzero = |v: u64| (v != 0).then_some(v);
        ConnectionStats {
            messages_received: self.messages_received.load(Ordering::SeqCst),
            malformed_messages: self.malformed_messages.load(Ordering::SeqCst),
            connect_attempts: self.connect_attempts.load(Ordering::SeqCst),
            connections: self.connections.load(Ordering::SeqCst),
            commands_sent: self.commands_sent.load(Ordering::SeqCst),
            last_connected_at_ms: nonzero(self.last_connected_ms.load(Ordering::SeqCst)),
            last_pong_at_ms: nonzero(self.last_pong_ms.load(Ordering::SeqCst)),
        }
    }
}
