//! Transport trait abstraction for pluggable telemetry links

use anyhow::Result;
use async_trait::async_trait;

/// One unit received from a text transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A complete text message
    Text(String),
    /// The peer closed the connection, with its close code if it sent one
    Closed(Option<u16>),
}

/// An open, message-oriented text stream
#[async_trait]
pub trait TextStream: Send {
    /// Wait for the next message or the close of the stream
    async fn recv(&mut self) -> Result<Incoming>;

    /// Send one text message
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the stream gracefully
    async fn close(&mut self) -> Result<()>;
}

/// Factory for creating transport connections
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// Attempt to connect to `endpoint`, returning an open stream on success
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TextStream>>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
