//! Listener setup and the accept loop.

use crate::config::Config;
use crate::handlers::{self, AppState};
use crate::session::Session;
use anyhow::{Context, Result};
use relay_core::{Clock, Dispatcher, Registry, SystemClock};
use relay_transport::websocket::{self, WebSocketListener};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A server with both listeners bound.
pub struct Server {
    ws: WebSocketListener,
    http: TcpListener,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the WebSocket and HTTP listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or either listener fails to bind.
    pub async fn bind(config: &Config) -> Result<Self> {
        Self::bind_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Bind both listeners, stamping envelopes with `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or either listener fails to bind.
    pub async fn bind_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let ws_addr = config.ws_bind_addr()?;
        let ws = WebSocketListener::bind(ws_addr)
            .await
            .with_context(|| format!("Failed to bind WebSocket listener on {}", ws_addr))?;

        let http_addr = config.http_bind_addr()?;
        let http = TcpListener::bind(http_addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", http_addr))?;

        let registry = Arc::new(Registry::new());

        Ok(Self {
            ws,
            http,
            dispatcher: Dispatcher::with_clock(registry, clock),
        })
    }

    /// Address of the WebSocket listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn ws_addr(&self) -> Result<SocketAddr> {
        Ok(self.ws.local_addr()?)
    }

    /// Address of the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.http.local_addr()?)
    }

    /// The connection registry shared by all sessions.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        self.dispatcher.registry().clone()
    }

    /// Serve both listeners until one of them fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server stops with an error.
    pub async fn serve(self) -> Result<()> {
        info!("WebSocket endpoint: ws://{}", self.ws_addr()?);
        info!("Health endpoint: http://{}/health", self.http_addr()?);

        let app = handlers::router(Arc::new(AppState::new(self.registry())));
        let Self {
            ws,
            http,
            dispatcher,
        } = self;

        tokio::try_join!(accept_loop(ws, dispatcher), async move {
            axum::serve(http, app).await.context("HTTP server failed")
        })?;

        Ok(())
    }
}

/// Accept WebSocket connections forever, one session task each.
async fn accept_loop(listener: WebSocketListener, dispatcher: Dispatcher) -> Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let mut conn = match websocket::upgrade(stream, addr).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(remote = %addr, error = %e, "WebSocket handshake failed");
                    return;
                }
            };

            Session::new(&mut conn, dispatcher).run().await;
            debug!(remote = %addr, "Session ended");
        });
    }
}
