//! # Relay Server
//!
//! Realtime broadcast relay server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! relay
//!
//! # Run with custom config
//! relay --config /path/to/relay.toml
//!
//! # Run with environment variables
//! RELAY_WS_PORT=9000 RELAY_HTTP_PORT=9001 relay
//! ```

use anyhow::Result;
use clap::Parser;
use relay_server::{Config, Server};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "relay", version)]
#[command(about = "Realtime broadcast relay over WebSocket", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host address to bind both listeners to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// WebSocket listener port
    #[arg(long)]
    ws_port: Option<u16>,

    /// HTTP status listener port
    #[arg(long)]
    http_port: Option<u16>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay=info,relay_server=debug,relay_core=debug,relay_transport=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    tracing::info!(
        "Starting relay server on {} (ws {}, http {})",
        config.host,
        config.ws_port,
        config.http_port
    );

    let server = Server::bind(&config).await?;
    server.serve().await?;

    Ok(())
}
