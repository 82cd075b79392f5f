//! JSON text codec for the telemetry link
//!
//! Each transport message carries exactly one JSON object:
//! ```text
//! { "type": <string>, ...payload members... }
//! ```
//!
//! Decoding never panics; anything that is not a JSON object with a string
//! `type` member is rejected with a [`CodecError`].

use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::{Inbound, Outbound, WireEnvelope};

/// Maximum message size (1 MiB) to prevent memory exhaustion
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Envelope is not a JSON object")]
    NotAnObject,

    #[error("Envelope has no string `type` member")]
    MissingType,
}

/// Encode a client envelope into a text frame
pub fn encode(envelope: &Outbound) -> Result<String, CodecError> {
    let text = serde_json::to_string(envelope)?;
    check_size(&text)?;
    Ok(text)
}

/// Encode an endpoint envelope into a text frame
pub fn encode_wire(envelope: &WireEnvelope) -> Result<String, CodecError> {
    let text = serde_json::to_string(envelope)?;
    check_size(&text)?;
    Ok(text)
}

/// Decode a text frame received by the client
pub fn decode(text: &str) -> Result<Inbound, CodecError> {
    let (kind, obj) = parse_object(text)?;
    Ok(Inbound::classify(&kind, &obj))
}

/// Decode a text frame received by an endpoint.
///
/// Returns `Ok(None)` for a well-formed envelope whose `type` is not a
/// client envelope type.
pub fn decode_outbound(text: &str) -> Result<Option<Outbound>, CodecError> {
    let (kind, obj) = parse_object(text)?;
    if !Outbound::KINDS.contains(&kind.as_str()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(Value::Object(obj))?))
}

fn check_size(text: &str) -> Result<(), CodecError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge(text.len()));
    }
    Ok(())
}

fn parse_object(text: &str) -> Result<(String, Map<String, Value>), CodecError> {
    check_size(text)?;

    let obj = match serde_json::from_str::<Value>(text)? {
        Value::Object(obj) => obj,
        _ => return Err(CodecError::NotAnObject),
    };

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?
        .to_string();

    Ok((kind, obj))
}
