//! Simulated vehicle and network shared by every client session

mod network;
mod vehicle;

pub use network::{SimNetwork, ZeroTierNetwork};
pub use vehicle::{SimVehicle, HOME_LAT, HOME_LON};

use gcs_link_shared::now_ms;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

/// One vehicle and its network link
pub struct Simulation {
    vehicle: Mutex<SimVehicle>,
    network: Mutex<SimNetwork>,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            vehicle: Mutex::new(SimVehicle::new()),
            network: Mutex::new(SimNetwork::new()),
        }
    }

    /// Advance the vehicle by one telemetry period
    pub async fn telemetry_tick(&self) -> Map<String, Value> {
        let mut vehicle = self.vehicle.lock().await;
        vehicle.tick(&mut rand::thread_rng(), now_secs())
    }

    /// Fresh network status
    pub async fn network_status(&self) -> Map<String, Value> {
        let mut network = self.network.lock().await;
        network.refresh(&mut rand::thread_rng())
    }

    pub async fn zerotier_networks(&self) -> Vec<ZeroTierNetwork> {
        self.network.lock().await.zerotier_networks().to_vec()
    }

    pub async fn handle_command(&self, command: &str, params: &Map<String, Value>) -> bool {
        let mut vehicle = self.vehicle.lock().await;
        let accepted = vehicle.handle_command(command, params);
        info!(
            "[SIM] Command {} {:?} -> {} (mode={}, armed={}, battery={:.1}%)",
            command,
            params,
            accepted,
            vehicle.mode(),
            vehicle.armed(),
            vehicle.battery()
        );
        accepted
    }

    pub async fn connect_zerotier(&self, network_id: &str) -> bool {
        let joined = self.network.lock().await.connect_zerotier(network_id);
        info!("[SIM] ZeroTier {} -> {}", network_id, joined);
        joined
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock seconds, as the endpoint stamps its messages
pub fn now_secs() -> f64 {
    now_ms() as f64 / 1000.0
}
