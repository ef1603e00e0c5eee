//! The live set of connections.
//!
//! The registry is shared by every session task, so all operations take
//! `&self` and are backed by a sharded concurrent map.

use crate::peer::{ConnectionId, OutboundFrame, Peer};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A connection with this ID is already registered.
    #[error("Connection already registered: {0}")]
    AlreadyRegistered(ConnectionId),

    /// The peer's transport is closed.
    #[error("Connection closed")]
    Closed,

    /// The peer's outbound queue has been dropped.
    #[error("Outbound queue closed")]
    QueueClosed,
}

/// Outcome of one fanout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Peers the frame was queued for.
    pub delivered: usize,
    /// Peers whose delivery failed.
    pub failed: usize,
}

impl FanoutReport {
    /// Number of open peers the fanout visited.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of registered connections.
    pub connections: usize,
    /// Number of registered connections whose transport is open.
    pub open: usize,
}

/// The set of currently connected peers.
#[derive(Debug, Default)]
pub struct Registry {
    peers: DashMap<ConnectionId, Peer>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is already registered; the existing entry is kept.
    pub fn register(&self, id: ConnectionId, peer: Peer) -> Result<(), RegistryError> {
        match self.peers.entry(id) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(connection = %entry.key(), "Registered");
                entry.insert(peer);
                Ok(())
            }
        }
    }

    /// Remove a connection.
    ///
    /// Returns `true` if the connection was registered. Removing an absent
    /// connection is a no-op.
    pub fn deregister(&self, id: &ConnectionId) -> bool {
        let removed = self.peers.remove(id).is_some();
        if removed {
            debug!(connection = %id, "Deregistered");
        }
        removed
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Check if a connection is registered.
    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.peers.contains_key(id)
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            connections: self.peers.len(),
            open: self.peers.iter().filter(|p| p.is_open()).count(),
        }
    }

    /// Visit every peer whose transport is open.
    ///
    /// Iterates a snapshot taken when the call starts, so `f` runs without any
    /// map lock held and may itself touch the registry. Each peer in the
    /// snapshot is visited at most once. Returns the number of peers visited.
    pub fn for_each_open<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&ConnectionId, &Peer),
    {
        let snapshot: Vec<(ConnectionId, Peer)> = self
            .peers
            .iter()
            .filter(|entry| entry.value().is_open())
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (id, peer) in &snapshot {
            f(id, peer);
        }

        snapshot.len()
    }

    /// Queue a frame for every open peer.
    ///
    /// A failed delivery is logged and counted; it never stops delivery to the
    /// remaining peers.
    pub fn broadcast(&self, frame: OutboundFrame) -> FanoutReport {
        let mut report = FanoutReport::default();

        self.for_each_open(|id, peer| match peer.deliver(frame.clone()) {
            Ok(()) => {
                trace!(connection = %id, "Queued frame");
                report.delivered += 1;
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Failed to deliver frame");
                report.failed += 1;
            }
        });

        report
    }
}
