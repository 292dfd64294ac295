//! Property test: decoding an encoded packet gives the packet back.

use std::sync::Arc;

use packetforge_protocol::{packet, wire_enum, Codec, SchemaRegistry, TextCodec};
use proptest::prelude::*;

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum CharacterClass {
        #[default]
        Adventurer = 0,
        Swordsman = 1,
        Archer = 2,
        Magician = 3,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ItemSlot => "islot" {
        #[index(0)]
        pub slot: i16,
        #[index(1)]
        pub vnum: i32,
        #[index(2)]
        pub amount: u8,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CharacterInfo => "c_info" {
        #[index(0)]
        pub id: i64,
        #[index(1)]
        pub name: String,
        #[index(2)]
        pub class: CharacterClass,
        #[index(3)]
        pub level: Option<u8>,
        #[index(4)]
        pub online: bool,
        #[index(5)]
        pub equipment: Vec<i16>,
        #[index(6)]
        pub gold: u32,
        #[index(7)]
        pub weapon: ItemSlot,
        #[index(9, serialize_to_end)]
        pub bio: String,
    }
}

/// `-1` is the absent sentinel and cannot be carried by a required field.
fn signed16() -> impl Strategy<Value = i16> {
    any::<i16>().prop_filter("sentinel", |v| *v != -1)
}

fn class() -> impl Strategy<Value = CharacterClass> {
    prop_oneof![
        Just(CharacterClass::Adventurer),
        Just(CharacterClass::Swordsman),
        Just(CharacterClass::Archer),
        Just(CharacterClass::Magician),
    ]
}

fn item_slot() -> impl Strategy<Value = ItemSlot> {
    (
        signed16(),
        any::<i32>().prop_filter("sentinel", |v| *v != -1),
        any::<u8>(),
    )
        .prop_map(|(slot, vnum, amount)| ItemSlot { slot, vnum, amount })
}

fn character() -> impl Strategy<Value = CharacterInfo> {
    (
        any::<i64>().prop_filter("sentinel", |v| *v != -1),
        "[A-Za-z][A-Za-z0-9]{0,11}",
        class(),
        any::<Option<u8>>(),
        any::<bool>(),
        prop::collection::vec(signed16(), 1..6),
        any::<u32>(),
        item_slot(),
        "([a-z]{1,8}( [a-z]{1,8}){0,4})?",
    )
        .prop_map(
            |(id, name, class, level, online, equipment, gold, weapon, bio)| CharacterInfo {
                id,
                name,
                class,
                level,
                online,
                equipment,
                gold,
                weapon,
                bio,
            },
        )
}

proptest! {
    #[test]
    fn encoded_packets_decode_to_themselves(packet in character()) {
        let codec = TextCodec::with_registry(Arc::new(SchemaRegistry::new()));
        let text = codec.encode(&packet).unwrap();
        let decoded: CharacterInfo = codec.decode(&text).unwrap();
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn leading_counter_does_not_change_the_result(
        packet in character(),
        counter in 0u32..100_000,
    ) {
        let codec = TextCodec::with_registry(Arc::new(SchemaRegistry::new()));
        let text = codec.encode(&packet).unwrap();

        let counted = codec.clone().with_leading_counter(true);
        let decoded: CharacterInfo = counted.decode(&format!("{counter} {text}")).unwrap();
        prop_assert_eq!(decoded, packet);
    }
}
