//! The seam between the session loop and a concrete socket.
//!
//! A [`Connection`] yields client data frames and accepts text frames back.
//! Sessions only ever see this trait, so the in-memory transport can stand in
//! for a real WebSocket in tests.

use async_trait::async_trait;
use relay_core::{ConnectionId, Liveness};
use thiserror::Error;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket is no longer open for writing.
    #[error("connection is closed")]
    ConnectionClosed,

    /// The client never completed the WebSocket upgrade.
    #[error("websocket upgrade failed: {0}")]
    Handshake(String),

    /// Writing a frame to the socket failed.
    #[error("write failed: {0}")]
    SendFailed(String),

    /// Reading from the socket failed with a protocol or socket error.
    #[error("read failed: {0}")]
    ReceiveFailed(String),

    /// Listener-level socket error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A data frame received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

/// One accepted client socket.
#[async_trait]
pub trait Connection: Send {
    /// Registry key for this connection.
    fn id(&self) -> &ConnectionId;

    /// Get the connection's shared open/closed flag.
    fn liveness(&self) -> Liveness;

    /// Receive the next data frame from the connection.
    ///
    /// Control frames are handled internally. Returns `None` once the
    /// connection is closed cleanly.
    async fn recv(&mut self) -> Result<Option<Incoming>, TransportError>;

    /// Send a text frame to the connection.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Peer address, for logging.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Whether the liveness flag is still set.
    fn is_open(&self) -> bool {
        self.liveness().is_open()
    }
}
