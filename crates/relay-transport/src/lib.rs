//! # relay-transport
//!
//! Transport abstraction layer for the relay broadcast server.
//!
//! - **WebSocket** - tokio-tungstenite listener and connections
//! - **Memory** - In-process connection pairs, for driving sessions without sockets
//!
//! ## Transport Abstraction
//!
//! Every transport hands the server a `Connection`, so session logic is
//! protocol-agnostic.
//!
//! ```rust,ignore
//! use relay_transport::{Connection, Incoming};
//!
//! async fn handle_connection(conn: &mut dyn Connection) {
//!     while let Ok(Some(Incoming::Text(text))) = conn.recv().await {
//!         // Process frame
//!     }
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use traits::{Connection, Incoming, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketListener};
