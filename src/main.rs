use clap::Parser;
use gcs_link::cli::Cli;
use gcs_link::operator::{self, OperatorCommand};
use gcs_link::telemetry::TelemetrySnapshot;
use gcs_link::{StateChange, TelemetryClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = cli.link_config();

    info!("GCS link starting");
    info!("  Endpoint: {}", config.endpoint);
    info!("  Reconnect delay: {:?}", config.reconnect_delay);

    let client = TelemetryClient::connect(config)?;

    // Log state changes
    let mut changes = client.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => log_change(&change),
                Err(RecvError::Lagged(n)) => warn!("[MAIN] Missed {} updates", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("{}", operator::HELP);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("[MAIN] Ctrl-C received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if !handle_line(&client, &line) {
                        break;
                    }
                }
                Ok(None) => {
                    // stdin closed; keep monitoring until Ctrl-C
                    debug!("[MAIN] stdin closed");
                    if tokio::signal::ctrl_c().await.is_err() {
                        error!("[MAIN] Failed to wait for Ctrl-C");
                    }
                    break;
                }
                Err(e) => {
                    error!("[MAIN] Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    }

    info!("[MAIN] Shutting down");
    client.shutdown().await;
    Ok(())
}

/// Returns false when the operator asked to quit
fn handle_line(client: &TelemetryClient, line: &str) -> bool {
    match operator::parse(line) {
        Ok(OperatorCommand::Vehicle { command, params }) => {
            client.dispatch(&command, params);
        }
        Ok(OperatorCommand::JoinNetwork(network_id)) => {
            client.dispatch_network_command(&network_id);
        }
        Ok(OperatorCommand::NetworkStatus) => {
            client.request_network_status();
            let status = client.network_status();
            info!(
                "[MAIN] Network: type={} signal={} vpn={} latency={:?}ms loss={:?}%",
                status.connection_type().unwrap_or("?"),
                status
                    .signal_strength()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "?".into()),
                status.vpn_status().unwrap_or("?"),
                status.latency_ms(),
                status.packet_loss()
            );
        }
        Ok(OperatorCommand::Stats) => {
            let stats = client.stats();
            info!(
                "[MAIN] State={} received={} malformed={} attempts={} connections={} commands={}",
                client.connection_state(),
                stats.messages_received,
                stats.malformed_messages,
                stats.connect_attempts,
                stats.connections,
                stats.commands_sent
            );
            if let Some(err) = client.last_error() {
                info!("[MAIN] Last error: {}", err);
            }
        }
        Ok(OperatorCommand::Help) => info!("{}", operator::HELP),
        Ok(OperatorCommand::Quit) => return false,
        Err(e) => warn!("[MAIN] {}", e),
    }
    true
}

fn log_change(change: &StateChange) {
    match change {
        StateChange::Connection(state) => info!("[MAIN] Link {}", state),
        StateChange::Telemetry(snapshot) => debug!("[MAIN] {}", summary(snapshot)),
        StateChange::NetworkStatus(status) => info!(
            "[MAIN] Network status: {} via {} (vpn {})",
            status
                .signal_strength()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".into()),
            status.connection_type().unwrap_or("unknown"),
            if status.vpn_connected() { "up" } else { "down" }
        ),
        StateChange::CommandAck(ack) => info!(
            "[MAIN] ACK {} success={}",
            ack.command.as_deref().unwrap_or("?"),
            ack.success.unwrap_or(false)
        ),
        StateChange::NetworkCommandResult { network_id, success } => info!(
            "[MAIN] ZeroTier {} success={}",
            network_id.as_deref().unwrap_or("?"),
            success
        ),
        StateChange::Notice(message) => info!("[MAIN] {}", message),
        StateChange::Error(message) => warn!("[MAIN] Error: {}", message),
    }
}

fn summary(t: &TelemetrySnapshot) -> String {
    let position = t
        .position()
        .map(|(lat, lon)| format!("{:.5},{:.5}", lat, lon))
        .unwrap_or_else(|| "?".into());
    let fix = if t.has_3d_fix() { "3D" } else { "none" };
    format!(
        "pos={} fix={} mode={} armed={} alt={:.1}m gs={:.1}m/s hdg={:.0} bat={:.0}% sats={}",
        position,
        fix,
        t.mode().unwrap_or("?"),
        t.armed().unwrap_or(false),
        t.relative_altitude().or(t.altitude()).unwrap_or(0.0),
        t.ground_speed().unwrap_or(0.0),
        t.heading().unwrap_or(0.0),
        t.battery_remaining().unwrap_or(0.0),
        t.satellites().unwrap_or(0)
    )
}
