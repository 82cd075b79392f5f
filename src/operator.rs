//! Operator console input
//!
//! One command per line: `ARM`, `SET_MODE mode=RTL`, `zerotier <network_id>`,
//! `netstatus`, `stats`, `help`, `quit`.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Vehicle command with `key=value` parameters
    Vehicle {
        command: String,
        params: Map<String, Value>,
    },
    JoinNetwork(String),
    NetworkStatus,
    Stats,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,

    #[error("Expected key=value, got '{0}'")]
    BadParam(String),

    #[error("Usage: zerotier <network_id>")]
    MissingNetworkId,
}

pub const HELP: &str = "Commands: ARM | DISARM | TAKEOFF | RTL | GUIDED | SET_MODE mode=<MODE> | \
zerotier <network_id> | netstatus | stats | quit";

/// Parse one console line
pub fn parse(line: &str) -> Result<OperatorCommand, ParseError> {
    let mut words = line.split_whitespace();
    let head = words.next().ok_or(ParseError::Empty)?;

    match head.to_ascii_lowercase().as_str() {
        "zerotier" => {
            let network_id = words.next().ok_or(ParseError::MissingNetworkId)?;
            Ok(OperatorCommand::JoinNetwork(network_id.to_string()))
        }
        "netstatus" => Ok(OperatorCommand::NetworkStatus),
        "stats" => Ok(OperatorCommand::Stats),
        "help" | "?" => Ok(OperatorCommand::Help),
        "quit" | "exit" => Ok(OperatorCommand::Quit),
        _ => {
            let mut params = Map::new();
            for word in words {
                let (key, value) = word
                    .split_once('=')
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| ParseError::BadParam(word.to_string()))?;
                params.insert(key.to_string(), param_value(value));
            }
            Ok(OperatorCommand::Vehicle {
                command: head.to_ascii_uppercase(),
                params,
            })
        }
    }
}

fn param_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}
