//! Text-frame WebSocket transport on top of tokio-tungstenite.
//!
//! Accepting a TCP stream and upgrading it are separate steps, so a slow
//! handshake never holds up the accept loop.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relay_core::{ConnectionId, Liveness};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::traits::{Connection, Incoming, TransportError};

/// Listener for WebSocket connections.
pub struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    /// Bind a listener to `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        info!("WebSocket transport listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// Get the local address this listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next TCP stream. The handshake is left to [`upgrade`].
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        debug!("Accepted TCP connection from {}", addr);
        Ok((stream, addr))
    }

    /// Accept the next stream and complete its WebSocket handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting or the handshake fails.
    pub async fn accept_connection(&self) -> Result<WebSocketConnection, TransportError> {
        let (stream, addr) = self.accept().await?;
        upgrade(stream, addr).await
    }
}

/// Perform the server side of the WebSocket handshake on an accepted stream.
///
/// # Errors
///
/// Returns an error if the handshake fails.
pub async fn upgrade(
    stream: TcpStream,
    remote_addr: SocketAddr,
) -> Result<WebSocketConnection, TransportError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    debug!("WebSocket handshake completed with {}", remote_addr);

    Ok(WebSocketConnection::new(ws_stream, remote_addr))
}

/// A WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    stream: WebSocketStream<TcpStream>,
    remote_addr: SocketAddr,
    liveness: Liveness,
}

impl WebSocketConnection {
    fn new(stream: WebSocketStream<TcpStream>, remote_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::generate(),
            stream,
            remote_addr,
            liveness: Liveness::new(),
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    async fn recv(&mut self) -> Result<Option<Incoming>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Incoming::Text(text))),
                Some(Ok(Message::Binary(data))) => return Ok(Some(Incoming::Binary(data))),
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite queues the pong itself; push it out now.
                    if let Err(e) = self.stream.flush().await {
                        warn!(connection = %self.id, "Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    debug!(connection = %self.id, "Received close frame");
                    self.liveness.close();
                    // Push out the close reply tungstenite queued. A server
                    // side flush ends with ConnectionClosed once it is sent.
                    match self.stream.flush().await {
                        Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {}
                        Err(e) => {
                            debug!(connection = %self.id, error = %e, "Failed to send close reply");
                        }
                    }
                    return Ok(None);
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    debug!(connection = %self.id, "Connection closed");
                    self.liveness.close();
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.liveness.close();
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.liveness.close();
                    return Ok(None);
                }
            }
        }
    }

    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.liveness.is_open() {
            return Err(TransportError::ConnectionClosed);
        }

        self.stream
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.liveness.close() {
            return Ok(());
        }

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e.to_string())),
        }
    }

    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.to_string())
    }
}
