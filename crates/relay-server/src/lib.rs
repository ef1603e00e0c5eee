//! # relay-server
//!
//! Realtime broadcast relay. Every well-formed message a client sends is
//! stamped and rebroadcast to every connected client, the sender included.
//!
//! Two listeners run side by side:
//!
//! - WebSocket (default port 8080) for the message protocol
//! - HTTP (default port 3001) serving `GET /health`

pub mod config;
pub mod handlers;
pub mod server;
pub mod session;

pub use config::Config;
pub use handlers::HealthResponse;
pub use server::Server;
pub use session::{Session, SessionState};
