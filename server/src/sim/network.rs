//! Simulated cellular link and ZeroTier overlay

use gcs_link_shared::SignalTier;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroTierNetwork {
    pub id: String,
    pub name: String,
    pub status: String,
    pub members: u32,
}

#[derive(Debug, Clone)]
pub struct SimNetwork {
    status: Map<String, Value>,
    zerotier: Vec<ZeroTierNetwork>,
}

impl SimNetwork {
    pub fn new() -> Self {
        let status = json!({
            "connection_type": "4G/LTE",
            "signal_strength": "excellent",
            "signal_dbm": -65,
            "vpn_status": "connected",
            "vpn_type": "ZeroTier",
            "nat_traversal": "enabled",
            "latency": 45,
            "packet_loss": 0.1,
            "bandwidth": "50 Mbps",
            "public_ip": "203.0.113.45",
            "private_ip": "10.147.17.23",
        });

        Self {
            status: match status {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            zerotier: vec![
                ZeroTierNetwork {
                    id: "1c33c1ced0b12345".into(),
                    name: "DroneNova-Fleet".into(),
                    status: "connected".into(),
                    members: 5,
                },
                ZeroTierNetwork {
                    id: "1c33c1ced0b67890".into(),
                    name: "Backup-Network".into(),
                    status: "available".into(),
                    members: 2,
                },
            ],
        }
    }

    /// Vary link conditions and return the new status
    pub fn refresh(&mut self, rng: &mut impl Rng) -> Map<String, Value> {
        let dbm: i32 = rng.gen_range(-75..=-55);
        let loss = (rng.gen_range(0.0..1.0_f64) * 10.0).round() / 10.0;

        self.status.insert("latency".into(), json!(rng.gen_range(30..=80)));
        self.status.insert("packet_loss".into(), json!(loss));
        self.status.insert("signal_dbm".into(), json!(dbm));
        self.status.insert(
            "signal_strength".into(),
            json!(SignalTier::from_dbm(f64::from(dbm)).to_string()),
        );
        self.status.clone()
    }

    pub fn zerotier_networks(&self) -> &[ZeroTierNetwork] {
        &self.zerotier
    }

    /// Join a known ZeroTier network; unknown ids fail
    pub fn connect_zerotier(&mut self, network_id: &str) -> bool {
        let Some(network) = self.zerotier.iter_mut().find(|n| n.id == network_id) else {
            return false;
        };
        network.status = "connected".into();
        self.status.insert("vpn_status".into(), json!("connected"));
        true
    }
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_refresh_keeps_tier_consistent_with_dbm() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut network = SimNetwork::new();

        for _ in 0..100 {
            let status = network.refresh(&mut rng);
            let dbm = status["signal_dbm"].as_f64().unwrap();
            assert!((-75.0..=-55.0).contains(&dbm));
            assert_eq!(
                status["signal_strength"],
                json!(SignalTier::from_dbm(dbm).to_string())
            );
            let latency = status["latency"].as_u64().unwrap();
            assert!((30..=80).contains(&latency));
        }
        assert_eq!(network.refresh(&mut rng)["vpn_type"], json!("ZeroTier"));
    }

    #[test]
    fn test_connect_zerotier() {
        let mut network = SimNetwork::new();
        assert!(network.connect_zerotier("1c33c1ced0b67890"));
        assert!(network
            .zerotier_networks()
            .iter()
            .all(|n| n.status == "connected"));

        assert!(!network.connect_zerotier("deadbeef00000000"));
    }
}
