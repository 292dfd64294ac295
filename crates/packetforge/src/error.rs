//! Unified error type for the packetforge framework.

use packetforge_protocol::ProtocolError;
use packetforge_transport::TransportError;

/// Top-level error that wraps the crate-specific errors.
///
/// When using the `packetforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The `?`
/// operator converts sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum PacketforgeError {
    /// A transport-level error (bind, framing, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (declaration, encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Socket setup outside the transports, e.g. reading the bound address.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: PacketforgeError = err.into();
        assert!(matches!(err, PacketforgeError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MalformedList {
            tokens: 5,
            field_count: 4,
        };
        let err: PacketforgeError = err.into();
        assert!(matches!(err, PacketforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let err: PacketforgeError = err.into();
        assert!(matches!(err, PacketforgeError::Io(_)));
        assert!(err.to_string().contains("taken"));
    }
}
