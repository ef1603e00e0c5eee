//! Connection identity and the per-connection handle held by the registry.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::registry::RegistryError;

/// An encoded envelope, shared between all recipients of one fanout.
pub type OutboundFrame = Arc<str>;

/// Counter for connection IDs, unique within the process.
static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let n = NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}", n))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Open/closed state of a transport, shared between the transport and the registry.
///
/// The transport flips it to closed; the registry only reads it.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Create a new flag in the open state.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Check if the transport is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the transport closed.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn close(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered connection.
#[derive(Debug, Clone)]
pub struct Peer {
    liveness: Liveness,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl Peer {
    /// Create a peer from a transport's liveness flag and its outbound queue.
    #[must_use]
    pub fn new(liveness: Liveness, outbound: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self { liveness, outbound }
    }

    /// Check if frames can currently be delivered to this peer.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.liveness.is_open() && !self.outbound.is_closed()
    }

    /// Queue a frame for this peer.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is closed or its queue is gone.
    pub fn deliver(&self, frame: OutboundFrame) -> Result<(), RegistryError> {
        if !self.liveness.is_open() {
            return Err(RegistryError::Closed);
        }
        self.outbound
            .send(frame)
            .map_err(|_| RegistryError::QueueClosed)
    }
}
