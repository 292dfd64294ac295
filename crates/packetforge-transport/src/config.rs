//! Framing configuration.

use serde::{Deserialize, Serialize};

/// Largest frame the server accepts from a client, in bytes.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Byte that terminates each frame unless configured otherwise.
pub const DEFAULT_DELIMITER: u8 = 0xFF;

/// How a byte stream is cut into messages.
///
/// With `use_framing` set, each message ends at the first `delimiter`
/// byte. Without it, every chunk handed to the framer is one complete
/// message, which is what message-oriented transports (WebSocket) want.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Byte that terminates a frame.
    pub delimiter: u8,

    /// Whether `delimiter` is honoured at all.
    pub use_framing: bool,

    /// Frames longer than this are a protocol error.
    pub max_message_len: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            use_framing: true,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }
}

impl FramingConfig {
    /// Delimiter-framed stream using `delimiter`.
    pub fn delimited(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Every received chunk is one message.
    pub fn unframed() -> Self {
        Self {
            use_framing: false,
            ..Self::default()
        }
    }

    /// Sets the maximum message length.
    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    /// Turns an outbound payload into wire bytes.
    ///
    /// The delimiter is appended when framing is enabled so that a peer
    /// framer with the same configuration yields `payload` back.
    pub fn frame(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.extend_from_slice(payload);
        if self.use_framing {
            bytes.push(self.delimiter);
        }
        bytes
    }
}
