//! Transport layer for packetforge.
//!
//! Turns network connections into a sequence of framed messages:
//!
//! - [`Framer`] slices an inbound byte stream into [`RawMessage`]s
//!   according to a [`FramingConfig`] (delimiter byte, or one message per
//!   received chunk) and enforces the maximum message length.
//! - [`Transport`] and [`Connection`] abstract over the network protocol;
//!   every connection owns one framer for its receive side.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

mod config;
mod error;
mod framer;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use config::{DEFAULT_DELIMITER, FramingConfig, MAX_MESSAGE_LEN};
pub use error::TransportError;
pub use framer::{Framer, RawMessage};
pub use tcp::{TcpConnection, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// The returned futures are `Send` so that a server generic over the
/// transport can drive each connection on its own Tokio task.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// Stops accepting connections. Later calls to
    /// [`accept`](Self::accept) fail with [`TransportError::Shutdown`];
    /// connections already accepted are unaffected.
    fn shutdown(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single connection that exchanges framed messages.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Frames `data` and sends it to the remote peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next complete message from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer cleanly closed the connection, and
    /// [`TransportError::ConnectionClosed`] once [`close`](Self::close)
    /// has been called.
    fn recv(&self) -> impl Future<Output = Result<Option<RawMessage>, Self::Error>> + Send;

    /// Closes the connection. Later sends and receives fail; closing twice
    /// is a no-op.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
