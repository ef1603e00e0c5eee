//! # relay-protocol
//!
//! Wire protocol definitions for the relay broadcast server.
//!
//! Clients and the server exchange UTF-8 JSON text frames over a WebSocket.
//!
//! ## Frame Types
//!
//! - `Inbound` - `{"message": "..."}`, sent by clients
//! - `Envelope` - `{"type": "...", "data": "...", "timestamp": "..."}`, sent by the server
//!
//! ## Example
//!
//! ```rust
//! use relay_protocol::{codec, Envelope};
//!
//! let inbound = codec::decode_inbound(r#"{"message":"hi"}"#).unwrap();
//! let envelope = Envelope::message(inbound.message, chrono::Utc::now());
//! let text = codec::encode(&envelope).unwrap();
//! assert!(text.starts_with(r#"{"type":"message","data":"hi""#));
//! ```

pub mod codec;
pub mod frames;
pub mod timestamp;

pub use codec::{decode_inbound, encode, ProtocolError};
pub use frames::{Envelope, EnvelopeKind, Inbound, WELCOME_TEXT};
pub use timestamp::format_timestamp;
