/// Errors that can occur in the transport layer.
///
/// `FrameTooLarge` and `EndOfStream` are framing violations: the stream can
/// no longer be trusted to be in sync, so the connection owner should close
/// the connection rather than keep reading.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,

    /// A frame exceeded the configured maximum message length.
    #[error("message is too big ({length} bytes), max allowed length is {max} bytes")]
    FrameTooLarge { length: usize, max: usize },

    /// The peer closed the stream while a frame was still incomplete.
    #[error("input stream closed with {buffered} bytes of an unfinished frame")]
    EndOfStream { buffered: usize },
}

impl TransportError {
    /// Returns `true` for errors that leave the framing state out of sync.
    pub fn is_framing_violation(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. } | Self::EndOfStream { .. })
    }
}
