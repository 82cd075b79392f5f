//! Telemetry and network-status models
//!
//! Both are flat maps from field name to a scalar value. Telemetry is merged
//! field by field; network status is replaced as a whole.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub use gcs_link_shared::SignalTier;

/// Well-known telemetry field names as sent by the endpoint
pub mod fields {
    pub const ALTITUDE: &str = "alt";
    pub const RELATIVE_ALTITUDE: &str = "relative_alt";
    pub const GROUND_SPEED: &str = "groundspeed";
    pub const AIRSPEED: &str = "airspeed";
    pub const HEADING: &str = "heading";
    pub const ARMED: &str = "armed";
    pub const BATTERY_REMAINING: &str = "battery_remaining";
    pub const VOLTAGE_BATTERY: &str = "voltage_battery";
    pub const BATTERY_VOLTAGE: &str = "battery_voltage";
    pub const CURRENT_BATTERY: &str = "current_battery";
    pub const SATELLITES: &str = "satellites";
    pub const FIX_TYPE: &str = "fix_type";
    pub const MODE: &str = "mode";
    pub const SYSTEM_STATUS: &str = "system_status";
    pub const LATITUDE: &str = "lat";
    pub const LONGITUDE: &str = "lon";
    pub const TIMESTAMP: &str = "timestamp";
}

/// A scalar telemetry value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a JSON value; `None` for null and non-scalar values
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Numeric view; numeric strings such as `"80"` are accepted
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Outcome of merging one telemetry payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Fields written
    pub updated: usize,
    /// Fields removed by an explicit `null`
    pub cleared: usize,
    /// Fields left unchanged because their value was not a scalar
    pub skipped: Vec<String>,
}

/// Latest merged view of all telemetry fields received so far
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TelemetrySnapshot {
    fields: BTreeMap<String, FieldValue>,
}

impl TelemetrySnapshot {
    /// Merge a partial update. Absent fields keep their previous value,
    /// `null` clears a field, non-scalar values are skipped.
    pub fn merge(&mut self, data: &Map<String, Value>) -> MergeReport {
        let mut report = MergeReport::default();

        for (key, value) in data {
            if value.is_null() {
                if self.fields.remove(key).is_some() {
                    report.cleared += 1;
                }
                continue;
            }

            match FieldValue::from_json(value) {
                Some(v) => {
                    self.fields.insert(key.clone(), v);
                    report.updated += 1;
                }
                None => report.skipped.push(key.clone()),
            }
        }

        report
    }

    /// Raw access to any field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Altitude in meters (MSL)
    pub fn altitude(&self) -> Option<f64> {
        self.number(fields::ALTITUDE)
    }

    /// Altitude above home in meters
    pub fn relative_altitude(&self) -> Option<f64> {
        self.number(fields::RELATIVE_ALTITUDE)
    }

    /// Ground speed in m/s
    pub fn ground_speed(&self) -> Option<f64> {
        self.number(fields::GROUND_SPEED)
    }

    pub fn airspeed(&self) -> Option<f64> {
        self.number(fields::AIRSPEED)
    }

    /// Heading in degrees
    pub fn heading(&self) -> Option<f64> {
        self.number(fields::HEADING)
    }

    pub fn armed(&self) -> Option<bool> {
        self.get(fields::ARMED).and_then(FieldValue::as_bool)
    }

    /// Battery remaining in percent
    pub fn battery_remaining(&self) -> Option<f64> {
        self.number(fields::BATTERY_REMAINING)
    }

    /// Battery voltage; endpoints use either field name
    pub fn battery_voltage(&self) -> Option<f64> {
        self.number(fields::VOLTAGE_BATTERY)
            .or_else(|| self.number(fields::BATTERY_VOLTAGE))
    }

    pub fn battery_current(&self) -> Option<f64> {
        self.number(fields::CURRENT_BATTERY)
    }

    /// Visible satellite count
    pub fn satellites(&self) -> Option<u32> {
        self.number(fields::SATELLITES)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u32)
    }

    /// GPS fix type (0-1 no fix, 2 2D, 3 3D, ...)
    pub fn fix_type(&self) -> Option<u8> {
        self.number(fields::FIX_TYPE)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u8)
    }

    /// Whether the GPS reports a 3D fix or better
    pub fn has_3d_fix(&self) -> bool {
        self.fix_type().is_some_and(|t| t >= 3)
    }

    /// Flight mode name
    pub fn mode(&self) -> Option<&str> {
        self.text(fields::MODE)
    }

    pub fn system_status(&self) -> Option<&str> {
        self.text(fields::SYSTEM_STATUS)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.number(fields::LATITUDE)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.number(fields::LONGITUDE)
    }

    /// Latitude and longitude, when both are known
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude()?, self.longitude()?))
    }

    /// Endpoint timestamp of the last update carrying one
    pub fn timestamp(&self) -> Option<f64> {
        self.number(fields::TIMESTAMP)
    }
}

/// Last known network status; replaced wholesale on every update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NetworkStatus {
    fields: BTreeMap<String, FieldValue>,
}

impl NetworkStatus {
    /// Build from a `network_status` payload; non-scalar members are dropped
    pub fn from_data(data: &Map<String, Value>) -> Self {
        let fields = data
            .iter()
            .filter_map(|(k, v)| FieldValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Link technology, e.g. "4G/LTE"
    pub fn connection_type(&self) -> Option<&str> {
        self.text("connection_type")
    }

    /// Reported tier, falling back to one derived from `signal_dbm`
    pub fn signal_strength(&self) -> Option<SignalTier> {
        self.text("signal_strength")
            .and_then(|s| s.parse().ok())
            .or_else(|| self.signal_dbm().map(SignalTier::from_dbm))
    }

    pub fn signal_dbm(&self) -> Option<f64> {
        self.get("signal_dbm").and_then(FieldValue::as_f64)
    }

    /// VPN product in use, e.g. "ZeroTier"
    pub fn vpn_type(&self) -> Option<&str> {
        self.text("vpn_type")
    }

    pub fn vpn_status(&self) -> Option<&str> {
        self.text("vpn_status")
    }

    pub fn vpn_connected(&self) -> bool {
        self.vpn_status() == Some("connected")
    }

    /// Round-trip latency in ms; numeric strings are accepted
    pub fn latency_ms(&self) -> Option<f64> {
        self.get("latency").and_then(FieldValue::as_f64)
    }

    pub fn packet_loss(&self) -> Option<f64> {
        self.get("packet_loss").and_then(FieldValue::as_f64)
    }
}
