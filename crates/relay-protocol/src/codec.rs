//! Codec for encoding and decoding relay frames.
//!
//! Frames are JSON text. Inbound decoding is strict about shape: the frame must
//! be a JSON object holding a string `message` field.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::frames::{Envelope, Inbound};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON.
    #[error("Malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Frame is valid JSON but not an object.
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The `message` field is absent.
    #[error("Missing field: message")]
    MissingMessage,

    /// The `message` field is not a string.
    #[error("Field `message` must be a string, got {0}")]
    InvalidMessage(&'static str),

    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a client frame.
///
/// # Errors
///
/// Returns an error if the text is not JSON, is not an object, or does not
/// carry a string `message` field.
pub fn decode_inbound(text: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

    let Value::Object(fields) = &value else {
        return Err(ProtocolError::NotAnObject(kind_of(&value)));
    };

    match fields.get("message") {
        None => return Err(ProtocolError::MissingMessage),
        Some(Value::String(_)) => {}
        Some(other) => return Err(ProtocolError::InvalidMessage(kind_of(other))),
    }

    Inbound::deserialize(value).map_err(ProtocolError::Malformed)
}

/// Encode an envelope to its JSON text form.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(ProtocolError::Encode)
}
