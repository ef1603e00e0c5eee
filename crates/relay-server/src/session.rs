//! Per-connection session.
//!
//! A session registers its connection, greets it, then multiplexes two
//! streams until the transport goes away: frames queued for this connection by
//! any fanout, and frames the client sends.

use relay_core::{Dispatcher, Peer};
use relay_transport::{Connection, Incoming};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, not yet registered.
    Connecting,
    /// Registered and processing frames.
    Open,
    /// Deregistered. Terminal.
    Closed,
}

/// Drives one connection from accept to close.
pub struct Session<'a, C: Connection + ?Sized> {
    conn: &'a mut C,
    dispatcher: Dispatcher,
    state: SessionState,
}

impl<'a, C: Connection + ?Sized> Session<'a, C> {
    /// Create a session for an accepted connection.
    pub fn new(conn: &'a mut C, dispatcher: Dispatcher) -> Self {
        Self {
            conn,
            dispatcher,
            state: SessionState::Connecting,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        trace!(connection = %self.conn.id(), from = ?self.state, to = ?next, "Session state");
        self.state = next;
    }

    /// Run until the connection closes or errors.
    pub async fn run(&mut self) {
        let id = self.conn.id().clone();
        let registry = self.dispatcher.registry().clone();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        if let Err(e) = registry.register(id.clone(), Peer::new(self.conn.liveness(), outbound_tx)) {
            warn!(connection = %id, error = %e, "Refusing connection");
            self.conn.liveness().close();
            self.transition(SessionState::Closed);
            return;
        }
        self.transition(SessionState::Open);
        let stats = registry.stats();
        info!(
            connection = %id,
            remote = self.conn.remote_addr().as_deref().unwrap_or("unknown"),
            clients = stats.connections,
            open = stats.open,
            "Client connected"
        );

        match self.dispatcher.welcome() {
            Ok(frame) => {
                if let Err(e) = self.conn.send_text(&frame).await {
                    warn!(connection = %id, error = %e, "Failed to send welcome");
                }
            }
            Err(e) => warn!(connection = %id, error = %e, "Failed to build welcome"),
        }

        while self.conn.is_open() {
            tokio::select! {
                // Frames queued for this connection by any fanout
                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = self.conn.send_text(&frame).await {
                        debug!(connection = %id, error = %e, "Write failed");
                        break;
                    }
                }

                // Frames from the client
                incoming = self.conn.recv() => {
                    match incoming {
                        Ok(Some(Incoming::Text(text))) => {
                            trace!(connection = %id, bytes = text.len(), "Received text frame");
                            if let Err(e) = self.dispatcher.dispatch(&id, &text) {
                                warn!(connection = %id, error = %e, "Discarding message");
                            }
                        }
                        Ok(Some(Incoming::Binary(data))) => {
                            warn!(connection = %id, bytes = data.len(), "Discarding binary frame");
                        }
                        Ok(None) => {
                            debug!(connection = %id, "Connection closed by peer");
                            break;
                        }
                        Err(e) => {
                            warn!(connection = %id, error = %e, "Connection error");
                            break;
                        }
                    }
                }
            }
        }

        self.conn.liveness().close();
        registry.deregister(&id);
        self.transition(SessionState::Closed);
        let stats = registry.stats();
        info!(
            connection = %id,
            clients = stats.connections,
            open = stats.open,
            "Client disconnected"
        );
    }
}
