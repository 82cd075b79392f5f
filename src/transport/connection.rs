//! A single transport connection running as its own task
//!
//! The task connects, reports `Open`, forwards every received message and
//! finishes with exactly one terminal event (`Close` or `Error`). It never
//! retries; that policy belongs to the supervisor.

use crate::transport::traits::{Incoming, TransportConnector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle events reported by a transport connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    /// Connection established
    Open,
    /// A text message arrived
    Message(String),
    /// Connection closed, with the close code if one was given
    Close { code: Option<u16> },
    /// Connection failed or broke
    Error(String),
}

/// A lifecycle event tagged with the connection that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub connection_id: u64,
    pub kind: TransportEventKind,
}

enum Outgoing {
    Text(String),
    Close,
}

/// Cloneable handle for writing to a running connection
#[derive(Debug, Clone)]
pub struct TransportHandle {
    id: u64,
    outbound: mpsc::UnboundedSender<Outgoing>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for Outgoing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outgoing::Text(_) => write!(f, "Text"),
            Outgoing::Close => write!(f, "Close"),
        }
    }
}

impl TransportHandle {
    /// Connection id this handle writes to
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection is currently open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queue a text message. Returns `false` if the connection is not open.
    pub fn send(&self, text: String) -> bool {
        self.is_open() && self.outbound.send(Outgoing::Text(text)).is_ok()
    }

    /// Ask the connection to close (or abandon a pending connect)
    pub fn close(&self) {
        let _ = self.outbound.send(Outgoing::Close);
    }
}

/// The supervisor's view of a spawned connection
pub struct TransportConnection {
    handle: TransportHandle,
}

impl TransportConnection {
    /// Spawn a connection task for `endpoint`, reporting into `events`
    pub fn spawn(
        connector: Arc<dyn TransportConnector>,
        endpoint: String,
        connection_id: u64,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        let handle = TransportHandle {
            id: connection_id,
            outbound: outbound_tx,
            open: open.clone(),
        };

        tokio::spawn(async move {
            run_connection(connector, endpoint, connection_id, open, outbound_rx, events).await;
        });

        Self { handle }
    }

    /// Handle for writing to this connection
    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    pub fn id(&self) -> u64 {
        self.handle.id
    }

    /// Request a graceful close; the task exits on its own
    pub fn close(self) {
        self.handle.close();
    }
}

async fn run_connection(
    connector: Arc<dyn TransportConnector>,
    endpoint: String,
    connection_id: u64,
    open: Arc<AtomicBool>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent {
            connection_id,
            kind,
        });
    };

    // Connect, unless the supervisor abandons the attempt first
    let connected = tokio::select! {
        result = connector.connect(&endpoint) => result,
        _ = outbound_rx.recv() => {
            debug!("[LINK] Connection {} abandoned while connecting", connection_id);
            return;
        }
    };

    let mut stream = match connected {
        Ok(stream) => stream,
        Err(e) => {
            emit(TransportEventKind::Error(format!("{:#}", e)));
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    emit(TransportEventKind::Open);

    enum Step {
        Outbound(Option<Outgoing>),
        Inbound(anyhow::Result<Incoming>),
    }

    loop {
        let step = tokio::select! {
            cmd = outbound_rx.recv() => Step::Outbound(cmd),
            incoming = stream.recv() => Step::Inbound(incoming),
        };

        match step {
            Step::Outbound(Some(Outgoing::Text(text))) => {
                if let Err(e) = stream.send_text(text).await {
                    open.store(false, Ordering::SeqCst);
                    emit(TransportEventKind::Error(format!("Send failed: {:#}", e)));
                    return;
                }
            }
            Step::Outbound(Some(Outgoing::Close)) | Step::Outbound(None) => {
                open.store(false, Ordering::SeqCst);
                if let Err(e) = stream.close().await {
                    debug!("[LINK] Close of connection {} failed: {:#}", connection_id, e);
                }
                emit(TransportEventKind::Close { code: None });
                return;
            }
            Step::Inbound(Ok(Incoming::Text(text))) => {
                emit(TransportEventKind::Message(text));
            }
            Step::Inbound(Ok(Incoming::Closed(code))) => {
                open.store(false, Ordering::SeqCst);
                emit(TransportEventKind::Close { code });
                return;
            }
            Step::Inbound(Err(e)) => {
                open.store(false, Ordering::SeqCst);
                emit(TransportEventKind::Error(format!("{:#}", e)));
                return;
            }
        }
    }
}
