//! Simulated vehicle
//!
//! Wanders around a fixed home point and drains its battery while armed.

use rand::Rng;
use serde_json::{json, Map, Value};

/// Home position (Bangalore)
pub const HOME_LAT: f64 = 12.9716;
pub const HOME_LON: f64 = 77.5946;

#[derive(Debug, Clone)]
pub struct SimVehicle {
    lat: f64,
    lon: f64,
    alt: f64,
    armed: bool,
    mode: String,
    battery: f64,
    voltage: f64,
    current: f64,
    heading: f64,
    groundspeed: f64,
}

impl SimVehicle {
    pub fn new() -> Self {
        Self {
            lat: HOME_LAT,
            lon: HOME_LON,
            alt: 100.0,
            armed: false,
            mode: "GUIDED".into(),
            battery: 95.0,
            voltage: 12.6,
            current: 0.0,
            heading: 0.0,
            groundspeed: 0.0,
        }
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn battery(&self) -> f64 {
        self.battery
    }

    /// Advance one telemetry period and report the full vehicle state
    pub fn tick(&mut self, rng: &mut impl Rng, now_secs: f64) -> Map<String, Value> {
        self.lat += rng.gen_range(-0.0001..0.0001);
        self.lon += rng.gen_range(-0.0001..0.0001);

        if self.armed {
            self.groundspeed = rng.gen_range(8.0..15.0);
            self.alt += rng.gen_range(-2.0..2.0);
            self.battery = (self.battery - 0.02).max(0.0);
            self.voltage = 12.0 + (self.battery / 100.0) * 0.6;
            self.current = rng.gen_range(5.0..15.0);
        } else {
            self.groundspeed = 0.0;
            self.current = 0.0;
        }

        self.heading = (self.heading + rng.gen_range(-5.0..5.0)).rem_euclid(360.0);

        let status = if self.armed { "ACTIVE" } else { "STANDBY" };
        let telemetry = json!({
            "lat": self.lat,
            "lon": self.lon,
            "alt": self.alt,
            "relative_alt": self.alt,
            "groundspeed": self.groundspeed,
            "airspeed": self.groundspeed * 1.1,
            "heading": self.heading,
            "armed": self.armed,
            "mode": self.mode,
            "system_status": status,
            "battery_remaining": self.battery,
            "voltage_battery": self.voltage,
            "current_battery": self.current,
            "satellites": rng.gen_range(12..=18),
            "fix_type": 3,
            "eph": rng.gen_range(0.5..2.0),
            "epv": rng.gen_range(1.0..3.0),
            "rssi": rng.gen_range(-75.0..-45.0),
            "noise": rng.gen_range(-90.0..-80.0),
            "roll": rng.gen_range(-10.0..10.0),
            "pitch": rng.gen_range(-5.0..5.0),
            "yaw": self.heading,
            "timestamp": now_secs,
        });

        match telemetry {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Apply an operator command; returns whether it was accepted
    pub fn handle_command(&mut self, command: &str, params: &Map<String, Value>) -> bool {
        match command {
            "ARM" => {
                self.armed = true;
                true
            }
            "DISARM" => {
                self.armed = false;
                true
            }
            "SET_MODE" => {
                if let Some(mode) = params.get("mode").and_then(Value::as_str) {
                    self.mode = mode.to_string();
                }
                true
            }
            "TAKEOFF" if self.armed => {
                self.mode = "TAKEOFF".into();
                true
            }
            "RTL" | "GUIDED" => {
                self.mode = command.to_string();
                true
            }
            _ => false,
        }
    }
}

impl Default for SimVehicle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(mode: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("mode".into(), json!(mode));
        params
    }

    #[test]
    fn test_takeoff_requires_armed() {
        let mut vehicle = SimVehicle::new();
        assert!(!vehicle.handle_command("TAKEOFF", &Map::new()));
        assert_eq!(vehicle.mode(), "GUIDED");

        assert!(vehicle.handle_command("ARM", &Map::new()));
        assert!(vehicle.handle_command("TAKEOFF", &Map::new()));
        assert_eq!(vehicle.mode(), "TAKEOFF");
    }

    #[test]
    fn test_mode_commands() {
        let mut vehicle = SimVehicle::new();
        assert!(vehicle.handle_command("SET_MODE", &params("LOITER")));
        assert_eq!(vehicle.mode(), "LOITER");

        // Accepted without a mode, nothing changes
        assert!(vehicle.handle_command("SET_MODE", &Map::new()));
        assert_eq!(vehicle.mode(), "LOITER");

        assert!(vehicle.handle_command("RTL", &Map::new()));
        assert_eq!(vehicle.mode(), "RTL");
        assert!(!vehicle.handle_command("SELF_DESTRUCT", &Map::new()));
    }

    #[test]
    fn test_battery_drains_only_while_armed() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut vehicle = SimVehicle::new();

        vehicle.tick(&mut rng, 0.0);
        assert_eq!(vehicle.battery(), 95.0);

        vehicle.handle_command("ARM", &Map::new());
        for _ in 0..50 {
            vehicle.tick(&mut rng, 0.0);
        }
        assert!((vehicle.battery() - 94.0).abs() < 1e-6);
    }

    #[test]
    fn test_tick_reports_known_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut vehicle = SimVehicle::new();
        let telemetry = vehicle.tick(&mut rng, 1_700_000_000.5);

        assert_eq!(telemetry["armed"], json!(false));
        assert_eq!(telemetry["system_status"], json!("STANDBY"));
        assert_eq!(telemetry["groundspeed"], json!(0.0));
        assert_eq!(telemetry["fix_type"], json!(3));
        assert_eq!(telemetry["timestamp"], json!(1_700_000_000.5));
        let sats = telemetry["satellites"].as_u64().unwrap();
        assert!((12..=18).contains(&sats));
        let heading = telemetry["heading"].as_f64().unwrap();
        assert!((0.0..360.0).contains(&heading));
    }
}
