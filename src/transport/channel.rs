//! In-process channel transport
//!
//! Every successful `connect` creates a fresh pair of channels and hands the
//! endpoint side to whoever holds the [`ChannelAcceptor`]. Used to embed a
//! simulated endpoint in-process and to drive the link in tests.

use crate::transport::traits::{Incoming, TextStream, TransportConnector};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Client side of a channel connection
pub struct ChannelStream {
    rx: mpsc::UnboundedReceiver<Incoming>,
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl TextStream for ChannelStream {
    async fn recv(&mut self) -> Result<Incoming> {
        // Endpoint dropped without a close frame
        Ok(self.rx.recv().await.unwrap_or(Incoming::Closed(None)))
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| anyhow!("Stream closed"))?;
        tx.send(text).map_err(|_| anyhow!("Endpoint gone"))
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

/// Endpoint side of a channel connection
pub struct ChannelPeer {
    to_client: mpsc::UnboundedSender<Incoming>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ChannelPeer {
    /// Deliver a text message to the client
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(Incoming::Text(text.into())).is_ok()
    }

    /// Close the connection from the endpoint side
    pub fn close(self, code: Option<u16>) {
        let _ = self.to_client.send(Incoming::Closed(code));
    }

    /// Next message sent by the client; `None` once the client closed
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

/// Receives the endpoint side of each new connection
pub struct ChannelAcceptor {
    peers: mpsc::UnboundedReceiver<ChannelPeer>,
}

impl ChannelAcceptor {
    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Option<ChannelPeer> {
        self.peers.recv().await
    }

    /// Take an already established connection, if any
    pub fn try_accept(&mut self) -> Option<ChannelPeer> {
        self.peers.try_recv().ok()
    }
}

/// Connector producing in-process channel connections
#[derive(Clone)]
pub struct ChannelConnector {
    peers: mpsc::UnboundedSender<ChannelPeer>,
    attempts: Arc<AtomicUsize>,
    refusing: Arc<AtomicBool>,
}

impl ChannelConnector {
    /// Create a connector and the acceptor that receives its connections
    pub fn new() -> (Self, ChannelAcceptor) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers: peers_tx,
            attempts: Arc::new(AtomicUsize::new(0)),
            refusing: Arc::new(AtomicBool::new(false)),
        };
        (connector, ChannelAcceptor { peers: peers_rx })
    }

    /// Make subsequent connection attempts fail (or succeed again)
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConnector for ChannelConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TextStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refusing.load(Ordering::SeqCst) {
            return Err(anyhow!("Connection to {} refused", endpoint));
        }

        let (to_client, rx) = mpsc::unbounded_channel();
        let (tx, from_client) = mpsc::unbounded_channel();

        self.peers
            .send(ChannelPeer {
                to_client,
                from_client,
            })
            .map_err(|_| anyhow!("No acceptor for {}", endpoint))?;

        Ok(Box::new(ChannelStream { rx, tx: Some(tx) }))
    }

    fn name(&self) -> &'static str {
        "Channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_pair_exchanges_text() {
        let (connector, mut acceptor) = ChannelConnector::new();
        let mut stream = connector.connect("mem://gcs").await.unwrap();
        let mut peer = acceptor.accept().await.unwrap();

        stream.send_text("hello".into()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("hello"));

        assert!(peer.send_text("world"));
        assert_eq!(stream.recv().await.unwrap(), Incoming::Text("world".into()));

        peer.close(Some(1001));
        assert_eq!(stream.recv().await.unwrap(), Incoming::Closed(Some(1001)));
    }

    #[tokio::test]
    async fn test_refusing_connector_counts_attempts() {
        let (connector, mut acceptor) = ChannelConnector::new();
        connector.set_refusing(true);

        assert!(connector.connect("mem://gcs").await.is_err());
        assert!(connector.connect("mem://gcs").await.is_err());
        assert_eq!(connector.attempts(), 2);
        assert!(acceptor.try_accept().is_none());
    }

    #[tokio::test]
    async fn test_closed_client_stream_rejects_send() {
        let (connector, _acceptor) = ChannelConnector::new();
        let mut stream = connector.connect("mem://gcs").await.unwrap();
        stream.close().await.unwrap();
        assert!(stream.send_text("late".into()).await.is_err());
    }
}
