//! Stream framer: cuts an inbound byte stream into messages.
//!
//! TCP delivers bytes, not messages. A single `read` may return half a
//! packet, or three packets glued together. The [`Framer`] owns the bytes
//! that have arrived but not yet formed a complete message, and hands out
//! [`RawMessage`]s as soon as their boundary is known.
//!
//! A framer belongs to exactly one connection and is driven by the task
//! that reads from it; it has no internal locking.

use std::borrow::Cow;

use crate::{FramingConfig, TransportError};

// ---------------------------------------------------------------------------
// RawMessage
// ---------------------------------------------------------------------------

/// One framed unit of bytes, without its delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMessage(Vec<u8>);

impl RawMessage {
    /// Wraps the given bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The message bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the message, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the message has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The message as text. Invalid UTF-8 is replaced, never rejected:
    /// the wire protocol is ASCII and the decoder reports garbage anyway.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for RawMessage {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for RawMessage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Framer
// ---------------------------------------------------------------------------

/// Accumulates bytes for one connection and slices them into messages.
#[derive(Debug)]
pub struct Framer {
    config: FramingConfig,
    buffer: Vec<u8>,
}

impl Framer {
    /// Creates an empty framer.
    pub fn new(config: FramingConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
        }
    }

    /// The framing configuration.
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Number of bytes held for a message that is not complete yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `bytes` and extracts every message that is now complete.
    ///
    /// Bytes after the last delimiter stay buffered for the next call.
    ///
    /// # Errors
    /// [`TransportError::FrameTooLarge`] when a message (or the pending
    /// partial data) exceeds the maximum length. The buffer is discarded:
    /// the stream is out of sync and the connection should be dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<RawMessage>, TransportError> {
        self.buffer.extend_from_slice(bytes);

        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Discards any buffered partial data.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(discarded = self.buffer.len(), "framer reset");
        }
        self.buffer.clear();
    }

    /// Turns an outbound payload into wire bytes for this framing.
    pub fn frame(&self, payload: &[u8]) -> Vec<u8> {
        self.config.frame(payload)
    }

    fn next_message(&mut self) -> Result<Option<RawMessage>, TransportError> {
        loop {
            if self.buffer.is_empty() {
                return Ok(None);
            }

            if !self.config.use_framing {
                return self.take_whole_buffer().map(Some);
            }

            let delimiter = self.config.delimiter;
            match self.buffer.iter().position(|&b| b == delimiter) {
                None => {
                    // No boundary yet. A partial frame that is already
                    // longer than the limit can never become valid.
                    let pending = self.buffer.len();
                    self.check_length(pending)?;
                    return Ok(None);
                }
                Some(0) => {
                    let more_delimiters = self.buffer[1..].contains(&delimiter);
                    if !more_delimiters && self.buffer.len() > 1 {
                        // Only a leading marker, no real boundary: the
                        // whole buffer is the message.
                        return self.take_whole_buffer().map(Some);
                    }
                    // Empty frame: drop the marker and look again.
                    self.buffer.drain(..1);
                }
                Some(end) => {
                    self.check_length(end)?;
                    let mut frame: Vec<u8> = self.buffer.drain(..=end).collect();
                    frame.pop();
                    return Ok(Some(RawMessage(frame)));
                }
            }
        }
    }

    fn take_whole_buffer(&mut self) -> Result<RawMessage, TransportError> {
        self.check_length(self.buffer.len())?;
        let frame = self.buffer.clone();
        self.buffer.clear();
        Ok(RawMessage(frame))
    }

    fn check_length(&mut self, length: usize) -> Result<(), TransportError> {
        let max = self.config.max_message_len;
        if length > max {
            tracing::warn!(length, max, "frame exceeds maximum message length");
            self.buffer.clear();
            return Err(TransportError::FrameTooLarge { length, max });
        }
        Ok(())
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(FramingConfig::default())
    }
}
