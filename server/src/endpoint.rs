//! WebSocket endpoint: accepts ground stations, answers their envelopes and
//! broadcasts simulated telemetry

use crate::command::CommandHandler;
use crate::session::SessionManager;
use crate::sim::Simulation;
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use gcs_link_shared::link::{NETWORK_STATUS_PERIOD_MS, TELEMETRY_PERIOD_MS};
use gcs_link_shared::{codec, WireEnvelope};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// Accept clients until the listener fails
pub async fn serve(
    listener: TcpListener,
    sim: Arc<Simulation>,
    sessions: Arc<SessionManager>,
) -> Result<()> {
    let handler = Arc::new(CommandHandler::new(sim));

    loop {
        let (stream, addr) = listener.accept().await?;
        let handler = handler.clone();
        let sessions = sessions.clone();

        tokio::spawn(async move {
            if let Err(e) = run_session(stream, addr, handler, sessions).await {
                warn!("[SIM] Session with {} failed: {:#}", addr, e);
            }
        });
    }
}

async fn run_session(
    stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<CommandHandler>,
    sessions: Arc<SessionManager>,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();

    let greeting = handler
        .greeting()
        .await
        .iter()
        .map(codec::encode_wire)
        .collect::<Result<Vec<_>, _>>()?;

    let (handle, mut outbound) = sessions.register(addr).await;
    for text in greeting {
        handle.send(text);
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let Some(reply) = handler.handle(&text).await else {
                    continue;
                };
                match codec::encode_wire(&reply) {
                    Ok(text) => {
                        handle.send(text);
                    }
                    Err(e) => error!("[SIM] Failed to encode reply: {}", e),
                }
            }
            Ok(Message::Close(frame)) => {
                debug!("[SIM] Client {} closed: {:?}", handle.id, frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("[SIM] Read error from {}: {}", addr, e);
                break;
            }
        }
    }

    sessions.unregister(handle.id).await;
    // Last sender gone: the writer drains and closes the socket
    drop(handle);
    writer.await?;
    Ok(())
}

/// Broadcast telemetry every period and network status every
/// `NETWORK_STATUS_PERIOD_MS` while at least one client is connected
pub async fn broadcast_telemetry(sim: Arc<Simulation>, sessions: Arc<SessionManager>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(TELEMETRY_PERIOD_MS));
    let network_every = (NETWORK_STATUS_PERIOD_MS / TELEMETRY_PERIOD_MS).max(1);
    let mut ticks: u64 = 0;

    loop {
        ticker.tick().await;
        ticks += 1;

        if sessions.count().await == 0 {
            continue;
        }

        let telemetry = WireEnvelope::telemetry(sim.telemetry_tick().await);
        broadcast(&sessions, &telemetry).await;

        if ticks % network_every == 0 {
            let status = WireEnvelope::network_status(sim.network_status().await);
            broadcast(&sessions, &status).await;
        }
    }
}

async fn broadcast(sessions: &SessionManager, envelope: &WireEnvelope) {
    match codec::encode_wire(envelope) {
        Ok(text) => {
            sessions.broadcast(&text).await;
        }
        Err(e) => error!("[SIM] Failed to encode {}: {}", envelope.kind, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn next_json<S>(source: &mut S) -> Value
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            if let Message::Text(text) = source.next().await.unwrap().unwrap() {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_session_greets_and_answers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sessions = Arc::new(SessionManager::new());
        tokio::spawn(serve(listener, Arc::new(Simulation::new()), sessions.clone()));

        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();
        let (mut sink, mut source) = ws.split();

        assert_eq!(next_json(&mut source).await["type"], "connection");
        let status = next_json(&mut source).await;
        assert_eq!(status["type"], "network_status");
        assert!(status["zerotier_networks"].is_array());
        assert_eq!(sessions.count().await, 1);

        sink.send(Message::Text(r#"{"type":"ping","timestamp":1}"#.into()))
            .await
            .unwrap();
        assert_eq!(next_json(&mut source).await["type"], "pong");

        sink.send(Message::Text("garbage".into())).await.unwrap();
        let reply = next_json(&mut source).await;
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["message"], "Invalid JSON format");

        sink.send(Message::Text(
            r#"{"type":"command","command":"ARM","params":{},"timestamp":1}"#.into(),
        ))
        .await
        .unwrap();
        let ack = next_json(&mut source).await;
        assert_eq!(ack["type"], "command_ack");
        assert_eq!(ack["success"], true);

        sink.close().await.unwrap();
        for _ in 0..50 {
            if sessions.count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sessions.count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_cadence() {
        let sessions = Arc::new(SessionManager::new());
        let (_handle, mut rx) = sessions.register("127.0.0.1:9000".parse().unwrap()).await;
        tokio::spawn(broadcast_telemetry(Arc::new(Simulation::new()), sessions.clone()));

        let mut telemetry = 0;
        loop {
            let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            match frame["type"].as_str() {
                Some("telemetry") => telemetry += 1,
                Some("network_status") => break,
                other => panic!("unexpected frame {:?}", other),
            }
        }
        assert_eq!(telemetry, NETWORK_STATUS_PERIOD_MS / TELEMETRY_PERIOD_MS);
    }
}
