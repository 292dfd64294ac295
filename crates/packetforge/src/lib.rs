//! # packetforge
//!
//! Token-based packet protocol layer for game servers.
//!
//! Clients speak whitespace-separated text messages such as
//! `$Upgrade 3 1 0`, each starting with a header token and usually
//! terminated by a delimiter byte. packetforge cuts the byte stream into
//! messages, decodes each one into the packet type declared for its
//! header, and hands it to your handler:
//!
//! - [`transport`]: framing and the TCP/WebSocket transports
//! - [`protocol`]: packet declarations, schema registry, encoder, decoder
//! - [`Router`] and [`PacketServer`]: dispatch and the accept loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use packetforge::prelude::*;
//!
//! packet! {
//!     #[derive(Debug, Default)]
//!     pub struct Ping => "ping" {
//!         #[index(0)]
//!         pub nonce: u32,
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PacketforgeError> {
//!     packetforge::init_logging("info");
//!     let router = Router::new().route(|ping: Ping, outbox: &mut Outbox<'_>| {
//!         outbox.push(&ping);
//!     })?;
//!     PacketServer::builder()
//!         .bind("127.0.0.1:4000")
//!         .build(router)
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod config;
mod error;
mod handler;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::PacketforgeError;
pub use router::{Dispatch, Outbox, Router};
pub use server::{PacketServer, PacketServerBuilder};

pub use packetforge_protocol as protocol;
pub use packetforge_transport as transport;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` when it is set and parses, otherwise
/// from `default_filter` (e.g. `"info"` or `"packetforge=debug"`). Calling
/// this when a global subscriber is already installed does nothing.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        tracing::debug!(error = %e, "logging already initialised");
    }
}

/// Everything needed to declare packets and run a server.
pub mod prelude {
    pub use crate::{
        Dispatch, Outbox, PacketServer, PacketServerBuilder, PacketforgeError, Router,
        ServerConfig,
    };
    pub use packetforge_protocol::{
        Codec, Packet, PacketFamily, ProtocolError, SchemaRegistry, TextCodec, packet,
        packet_family, wire_enum,
    };
    pub use packetforge_transport::{ConnectionId, FramingConfig, TransportError};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_logging_twice_is_harmless() {
        super::init_logging("warn");
        super::init_logging("debug");
    }
}
