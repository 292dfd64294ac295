//! Property tests for the framer.

use packetforge_transport::{Framer, FramingConfig};
use proptest::prelude::*;

const DELIMITER: u8 = 0xFF;

fn message() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>().prop_filter("no delimiter", |b| *b != DELIMITER), 1..64)
}

proptest! {
    /// Framing a list of messages and feeding the bytes back in arbitrary
    /// chunks yields the same list.
    #[test]
    fn framed_messages_survive_any_chunking(
        messages in prop::collection::vec(message(), 0..16),
        cut in 1usize..32,
    ) {
        let config = FramingConfig::default();
        let mut wire = Vec::new();
        for m in &messages {
            wire.extend(config.frame(m));
        }

        let mut framer = Framer::new(config);
        let mut out = Vec::new();
        for chunk in wire.chunks(cut) {
            out.extend(framer.feed(chunk).unwrap().into_iter().map(|m| m.into_bytes()));
        }

        prop_assert_eq!(out, messages);
        prop_assert_eq!(framer.buffered(), 0);
    }
}
