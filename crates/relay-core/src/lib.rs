//! # relay-core
//!
//! Core types and message fanout for the relay broadcast server.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Peer** - A registered connection: its liveness flag and outbound queue
//! - **Registry** - The live set of connections, safe for concurrent use
//! - **Dispatcher** - Turns inbound frames into envelopes and fans them out
//! - **Clock** - Time source for envelope timestamps
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│ Dispatcher  │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                                       │
//!        └──────────── outbound queue ◀──────────┘
//! ```

pub mod clock;
pub mod dispatcher;
pub mod peer;
pub mod registry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatcher::{DispatchError, Dispatcher};
pub use peer::{ConnectionId, Liveness, OutboundFrame, Peer};
pub use registry::{FanoutReport, Registry, RegistryError, RegistryStats};
