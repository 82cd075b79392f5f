//! Session manager for tracking all connected clients

use super::connection::SessionHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// Manages all active client sessions
pub struct SessionManager {
    /// Map of session id -> session handle
    sessions: Arc<RwLock<HashMap<u64, SessionHandle>>>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a new client and return its handle and outbound queue
    pub async fn register(
        &self,
        addr: SocketAddr,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (handle, rx) = SessionHandle::new(id, addr);

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, handle.clone());
        info!("[SIM] Client {} connected from {} ({} total)", id, addr, sessions.len());
        (handle, rx)
    }

    pub async fn unregister(&self, id: u64) {
        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.remove(&id) {
            info!(
                "[SIM] Client {} ({}) disconnected after {:?} ({} total)",
                id,
                handle.addr,
                handle.connected_at.elapsed(),
                sessions.len()
            );
        }
    }

    /// Broadcast a frame to all connected clients; returns how many got it
    pub async fn broadcast(&self, text: &str) -> usize {
        let sessions = self.sessions.read().await;
        let mut delivered = 0;
        for (id, handle) in sessions.iter() {
            if handle.is_closed() {
                debug!("[SIM] Client {} writer gone, skipping", id);
                continue;
            }
            if handle.send(text.to_string()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Get the number of connected clients
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
