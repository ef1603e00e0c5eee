//! In-process transport.
//!
//! [`pair`] returns a server-side [`MemoryConnection`] and the [`MemoryClient`]
//! that drives it. Dropping the client (or calling [`MemoryClient::hang_up`])
//! closes the connection the same way a remote close would.

use async_trait::async_trait;
use relay_core::{ConnectionId, Liveness};
use tokio::sync::mpsc;

use crate::traits::{Connection, Incoming, TransportError};

/// Server side of an in-process connection.
pub struct MemoryConnection {
    id: ConnectionId,
    liveness: Liveness,
    inbound: mpsc::UnboundedReceiver<Incoming>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Client side of an in-process connection.
pub struct MemoryClient {
    inbound: Option<mpsc::UnboundedSender<Incoming>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

/// Create a connected pair.
#[must_use]
pub fn pair() -> (MemoryConnection, MemoryClient) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let conn = MemoryConnection {
        id: ConnectionId::generate(),
        liveness: Liveness::new(),
        inbound: in_rx,
        outbound: out_tx,
    };
    let client = MemoryClient {
        inbound: Some(in_tx),
        outbound: out_rx,
    };

    (conn, client)
}

impl MemoryClient {
    /// Send a text frame to the server.
    ///
    /// Returns `false` if the connection is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(Incoming::Text(text.into()))
    }

    /// Send any data frame to the server.
    ///
    /// Returns `false` if the connection is gone.
    pub fn send(&self, frame: Incoming) -> bool {
        self.inbound
            .as_ref()
            .is_some_and(|tx| tx.send(frame).is_ok())
    }

    /// Wait for the next text frame from the server.
    ///
    /// Returns `None` once the server side is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Take a text frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    /// Close the client side; the server observes a clean close.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    async fn recv(&mut self) -> Result<Option<Incoming>, TransportError> {
        match self.inbound.recv().await {
            Some(frame) => Ok(Some(frame)),
            None => {
                self.liveness.close();
                Ok(None)
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.liveness.is_open() {
            return Err(TransportError::ConnectionClosed);
        }
        self.outbound
            .send(text.to_owned())
            .map_err(|_| TransportError::SendFailed("client dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.liveness.close();
        self.inbound.close();
        Ok(())
    }

    fn remote_addr(&self) -> Option<String> {
        Some("memory".to_string())
    }
}
