//! `PacketServer` builder and accept loop.
//!
//! This is the entry point for running a packet server. It ties the
//! layers together: transport (bytes) → framer (frames) → codec (packets)
//! → router (handlers).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use packetforge_transport::{
    Connection, FramingConfig, TcpTransport, Transport, TransportError, WebSocketTransport,
};

use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::router::Router;
use crate::PacketforgeError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) router: Router,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a packet server.
///
/// # Example
///
/// ```rust,no_run
/// use packetforge::prelude::*;
///
/// # async fn start(router: Router) -> Result<(), PacketforgeError> {
/// let server = PacketServer::builder()
///     .bind("0.0.0.0:4000")
///     .leading_counter(true)
///     .build(router)
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PacketServerBuilder {
    config: ServerConfig,
}

impl PacketServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how inbound bytes are framed.
    pub fn framing(mut self, framing: FramingConfig) -> Self {
        self.config.framing = framing;
        self
    }

    /// Sets whether inbound messages start with a sequence counter. A
    /// router built with the counter switched on keeps it either way.
    pub fn leading_counter(mut self, includes_leading_counter: bool) -> Self {
        self.config.includes_leading_counter = includes_leading_counter;
        self
    }

    /// Sets how long a connection may stay silent.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a framed TCP listener and returns the server.
    pub async fn build(self, router: Router) -> Result<PacketServer<TcpTransport>, PacketforgeError> {
        let transport = TcpTransport::bind(&self.config.bind_addr, self.config.framing).await?;
        Ok(PacketServer::new(transport, router, &self.config))
    }

    /// Binds a WebSocket listener and returns the server.
    ///
    /// Each WebSocket message is fed to the framer, so the configured
    /// framing still applies; use [`FramingConfig::unframed`] for one
    /// packet per WebSocket message.
    pub async fn build_websocket(
        self,
        router: Router,
    ) -> Result<PacketServer<WebSocketTransport>, PacketforgeError> {
        let transport =
            WebSocketTransport::bind(&self.config.bind_addr, self.config.framing).await?;
        Ok(PacketServer::new(transport, router, &self.config))
    }
}

/// A bound packet server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PacketServer<T: Transport> {
    transport: T,
    state: Arc<ServerState>,
}

impl PacketServer<TcpTransport> {
    /// Creates a new builder.
    pub fn builder() -> PacketServerBuilder {
        PacketServerBuilder::new()
    }
}

impl<T> PacketServer<T>
where
    T: Transport<Error = TransportError>,
    T::Connection: Connection<Error = TransportError>,
{
    /// The router keeps a leading counter it was already configured with;
    /// the config can switch the counter on but not off.
    fn new(transport: T, router: Router, config: &ServerConfig) -> Self {
        let includes_leading_counter =
            router.codec().includes_leading_counter() || config.includes_leading_counter;
        let router = router.leading_counter(includes_leading_counter);
        Self {
            transport,
            state: Arc::new(ServerState {
                router,
                idle_timeout: config.idle_timeout,
            }),
        }
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The router connections are dispatched through.
    pub fn router(&self) -> &Router {
        &self.state.router
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated or the transport reports that it was shut
    /// down.
    pub async fn run(mut self) -> Result<(), PacketforgeError> {
        tracing::info!(addr = ?self.local_addr().ok(), "packet server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = conn.id();
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => {
                    tracing::info!("packet server stopped");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
