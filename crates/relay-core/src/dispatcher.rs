//! Fanout dispatch.
//!
//! The dispatcher validates an inbound frame, stamps it into a `message`
//! envelope and queues it for every open connection, the sender included.

use crate::clock::{Clock, SystemClock};
use crate::peer::{ConnectionId, OutboundFrame};
use crate::registry::{FanoutReport, Registry};
use relay_protocol::{codec, Envelope, ProtocolError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound frame was rejected; nothing was sent.
    #[error("Rejected frame: {0}")]
    Rejected(#[from] ProtocolError),
}

/// Builds envelopes and fans them out over a shared registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Create a dispatcher using the system clock.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    /// Create a dispatcher with a custom clock.
    #[must_use]
    pub fn with_clock(registry: Arc<Registry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// The registry this dispatcher fans out over.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Encode the greeting for a newly accepted connection.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn welcome(&self) -> Result<OutboundFrame, DispatchError> {
        let text = codec::encode(&Envelope::welcome(self.clock.now()))?;
        Ok(Arc::from(text))
    }

    /// Handle one inbound text frame from `source`.
    ///
    /// On success the envelope has been queued for every open connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid inbound message. No
    /// connection receives anything in that case.
    pub fn dispatch(&self, source: &ConnectionId, raw: &str) -> Result<FanoutReport, DispatchError> {
        let inbound = codec::decode_inbound(raw)?;
        let envelope = Envelope::message(inbound.message, self.clock.now());
        let frame: OutboundFrame = Arc::from(codec::encode(&envelope)?);

        let report = self.registry.broadcast(frame);
        debug!(
            connection = %source,
            kind = envelope.kind.as_str(),
            attempted = report.attempted(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast message"
        );

        Ok(report)
    }
}
