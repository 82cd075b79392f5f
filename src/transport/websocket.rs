//! WebSocket transport implementation for the telemetry endpoint

use crate::transport::traits::{Incoming, TextStream, TransportConnector};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// WebSocket stream wrapper implementing TextStream
pub struct WebSocketTextStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTextStream {
    pub fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { inner: stream }
    }
}

#[async_trait]
impl TextStream for WebSocketTextStream {
    async fn recv(&mut self) -> Result<Incoming> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Incoming::Text(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    // Some endpoints send JSON as binary frames
                    let text = String::from_utf8(bytes.to_vec())
                        .map_err(|_| anyhow!("Binary frame is not UTF-8"))?;
                    return Ok(Incoming::Text(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Incoming::Closed(frame.map(|f| u16::from(f.code))));
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(anyhow!("WebSocket error: {}", e)),
                None => return Ok(Incoming::Closed(None)),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.inner.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close(None).await?;
        Ok(())
    }
}

/// WebSocket connector for `ws://` and `wss://` endpoints
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    /// Create a new connector that gives up on a handshake after `connect_timeout`
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TextStream>> {
        let (stream, _response) = timeout(self.connect_timeout, connect_async(endpoint))
            .await
            .map_err(|_| anyhow!("Connect to {} timed out", endpoint))??;
        Ok(Box::new(WebSocketTextStream::new(stream)))
    }

    fn name(&self) -> &'static str {
        "WebSocket"
    }
}
