//! Cellular signal quality tiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signal strength tier reported for the cellular link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SignalTier {
    /// Tier for a received signal level in dBm
    pub fn from_dbm(dbm: f64) -> Self {
        if dbm >= -65.0 {
            SignalTier::Excellent
        } else if dbm >= -75.0 {
            SignalTier::Good
        } else if dbm >= -85.0 {
            SignalTier::Fair
        } else {
            SignalTier::Poor
        }
    }
}

impl FromStr for SignalTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(SignalTier::Excellent),
            "good" => Ok(SignalTier::Good),
            "fair" => Ok(SignalTier::Fair),
            "poor" => Ok(SignalTier::Poor),
            other => Err(format!("unknown signal tier: {}", other)),
        }
    }
}

impl fmt::Display for SignalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalTier::Excellent => "excellent",
            SignalTier::Good => "good",
            SignalTier::Fair => "fair",
            SignalTier::Poor => "poor",
        };
        write!(f, "{}", s)
    }
}
