//! Frame types for the relay protocol.
//!
//! Every frame is a single JSON object carried in one WebSocket text message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::format_timestamp;

/// Greeting carried by the `welcome` envelope.
pub const WELCOME_TEXT: &str = "Welcome to the WebSocket server!";

/// Envelope type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Sent once to a connection right after it is accepted.
    Welcome,
    /// A rebroadcast client message.
    Message,
}

impl EnvelopeKind {
    /// The tag as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Welcome => "welcome",
            EnvelopeKind::Message => "message",
        }
    }
}

/// A client-to-server frame.
///
/// Fields other than `message` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Inbound {
    /// The text to broadcast.
    pub message: String,
}

/// A server-to-client frame.
///
/// Field order matches the wire layout: `type`, `data`, `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope tag.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Payload text.
    pub data: String,
    /// ISO-8601 UTC time the envelope was built, millisecond precision.
    pub timestamp: String,
}

impl Envelope {
    /// Create an envelope of the given kind stamped with `at`.
    #[must_use]
    pub fn new(kind: EnvelopeKind, data: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            data: data.into(),
            timestamp: format_timestamp(at),
        }
    }

    /// Create the greeting sent to a freshly accepted connection.
    #[must_use]
    pub fn welcome(at: DateTime<Utc>) -> Self {
        Self::new(EnvelopeKind::Welcome, WELCOME_TEXT, at)
    }

    /// Create a broadcast envelope carrying `data` verbatim.
    #[must_use]
    pub fn message(data: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(EnvelopeKind::Message, data, at)
    }
}
