mod command;
mod endpoint;
mod session;
mod sim;

use clap::Parser;
use session::SessionManager;
use sim::Simulation;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(name = "gcs-sim", about = "Simulated vehicle telemetry endpoint")]
struct Args {
    /// Address to accept ground stations on
    #[arg(env = "GCS_SIM_BIND", default_value = DEFAULT_BIND)]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.bind).await?;
    info!("[SIM] Listening on ws://{}/ws", listener.local_addr()?);
    info!("[SIM] Simulated vehicle at {:.4}, {:.4}", sim::HOME_LAT, sim::HOME_LON);

    let sim = Arc::new(Simulation::new());
    let sessions = Arc::new(SessionManager::new());

    tokio::spawn(endpoint::broadcast_telemetry(sim.clone(), sessions.clone()));

    tokio::select! {
        result = endpoint::serve(listener, sim, sessions) => {
            if let Err(e) = &result {
                error!("[SIM] Listener failed: {:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("[SIM] Shutting down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_argument() {
        let args = Args::try_parse_from(["gcs-sim", "0.0.0.0:9100"]).unwrap();
        assert_eq!(args.bind, "0.0.0.0:9100");
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
