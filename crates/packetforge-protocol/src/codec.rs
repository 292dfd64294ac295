//! Codec trait and the token text codec.
//!
//! The rest of the framework only needs something that implements
//! [`Codec`]: typed packet in, wire text out, and back. [`TextCodec`] is
//! the implementation for the token format, driven by a
//! [`SchemaRegistry`].

use std::sync::Arc;

use crate::decoder::decode_record;
use crate::encoder::encode_record;
use crate::{Packet, ProtocolError, SchemaRegistry};

/// Converts packets to wire text and back.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a packet.
    ///
    /// # Errors
    /// The packet's schema is invalid, or a value does not fit its kind.
    fn encode<P: Packet>(&self, packet: &P) -> Result<String, ProtocolError>;

    /// Decodes a message into a packet of type `P`.
    ///
    /// # Errors
    /// A token cannot be converted to its field's type.
    fn decode<P: Packet>(&self, text: &str) -> Result<P, ProtocolError>;
}

/// [`Codec`] for the whitespace-separated token format.
#[derive(Debug, Clone)]
pub struct TextCodec {
    registry: Arc<SchemaRegistry>,
    includes_leading_counter: bool,
}

impl TextCodec {
    /// A codec over the process-wide registry.
    pub fn new() -> Self {
        Self::with_registry(SchemaRegistry::global())
    }

    /// A codec over the given registry.
    pub fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            includes_leading_counter: false,
        }
    }

    /// Whether inbound messages start with a sequence counter before the
    /// header token.
    pub fn with_leading_counter(mut self, includes_leading_counter: bool) -> Self {
        self.includes_leading_counter = includes_leading_counter;
        self
    }

    /// The registry schemas are read from.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Returns `true` if inbound messages carry a sequence counter.
    pub fn includes_leading_counter(&self) -> bool {
        self.includes_leading_counter
    }

    /// Encodes a packet, or returns an empty string if it cannot be
    /// encoded. An empty result means "do not send".
    pub fn serialize<P: Packet>(&self, packet: &P) -> String {
        self.encode(packet).unwrap_or_else(|e| {
            tracing::warn!(header = P::HEADER, error = %e, "wrong packet format");
            String::new()
        })
    }

    /// Decodes a message, or returns `None` if it is malformed.
    pub fn deserialize<P: Packet>(&self, text: &str) -> Option<P> {
        match self.decode(text) {
            Ok(packet) => Some(packet),
            Err(e) => {
                tracing::warn!(packet = text, error = %e, "the serialized packet has the wrong format");
                None
            }
        }
    }

    /// The header token of a message, skipping the sequence counter when
    /// one is expected.
    pub fn header_of<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.split_whitespace()
            .nth(usize::from(self.includes_leading_counter))
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for TextCodec {
    fn encode<P: Packet>(&self, packet: &P) -> Result<String, ProtocolError> {
        let schema = self.registry.schema_of::<P>()?;
        encode_record(&packet.to_record(), &schema, &self.registry)
    }

    fn decode<P: Packet>(&self, text: &str) -> Result<P, ProtocolError> {
        let schema = self.registry.schema_of::<P>()?;
        let record = decode_record(text, &schema, &self.registry, self.includes_leading_counter)?;
        P::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet;

    packet! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Rest => "rest" {
            #[index(0)]
            amount: u8,
        }
    }

    packet! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Headless => " " {
            #[index(0)]
            amount: u8,
        }
    }

    fn codec() -> TextCodec {
        TextCodec::with_registry(Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn test_serialize_and_deserialize() {
        let codec = codec();
        let text = codec.serialize(&Rest { amount: 3 });
        assert_eq!(text, "rest 3");
        assert_eq!(codec.deserialize::<Rest>(&text), Some(Rest { amount: 3 }));
    }

    #[test]
    fn test_serialize_failure_is_empty() {
        assert_eq!(codec().serialize(&Headless { amount: 1 }), "");
    }

    #[test]
    fn test_deserialize_failure_is_none() {
        assert_eq!(codec().deserialize::<Rest>("rest 300"), None);
        assert_eq!(codec().deserialize::<Rest>("rest lots"), None);
    }

    #[test]
    fn test_header_of() {
        let plain = codec();
        assert_eq!(plain.header_of("rest 3"), Some("rest"));
        assert_eq!(plain.header_of("   "), None);

        let counted = codec().with_leading_counter(true);
        assert_eq!(counted.header_of("17 rest 3"), Some("rest"));
        assert_eq!(counted.header_of("17"), None);
    }
}
