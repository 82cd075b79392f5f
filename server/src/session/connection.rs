//! Individual client session handling

use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// Handle to send text frames to a specific client
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: u64,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    tx: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    /// Create a handle and the queue its writer task drains
    pub fn new(id: u64, addr: SocketAddr) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            addr,
            connected_at: Instant::now(),
            tx,
        };
        (handle, rx)
    }

    /// Queue a frame; false once the writer is gone
    pub fn send(&self, text: String) -> bool {
        self.tx.send(text).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
