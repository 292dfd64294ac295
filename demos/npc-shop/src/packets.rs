//! Wire declarations for the shop packets.

use packetforge::prelude::*;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ShopKind {
        #[default]
        Character = 0,
        Npc = 1,
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum InventoryType {
        #[default]
        Equipment = 0,
        Main = 1,
        Etc = 2,
    }
}

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum MemoKind {
        #[default]
        Info = 0,
        Success = 1,
        Warning = 2,
        Failure = 3,
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

packet! {
    /// `buy <kind> <owner> <slot> <amount>`
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct BuyPacket => "buy" {
        #[index(0)]
        pub kind: ShopKind,
        #[index(1)]
        pub owner_id: i64,
        #[index(2)]
        pub slot: i16,
        #[index(3)]
        pub amount: u8,
    }
}

packet! {
    /// Selling to an NPC. The first two positions are unused by the shop.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SellPacket => "sell" {
        #[index(2)]
        pub inventory_type: InventoryType,
        #[index(3)]
        pub slot: u8,
        #[index(4)]
        pub amount: u8,
    }
}

packet! {
    /// One line of a player shop, sent without `.` joins.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ShopItem => "shop_item" {
        #[index(0)]
        pub inventory_type: InventoryType,
        #[index(1)]
        pub slot: i16,
        #[index(2)]
        pub amount: u8,
        #[index(3)]
        pub price: i64,
    }
}

packet! {
    /// Opens a player shop: `m_shop 0 <type> <slot> <amount> <price> ...`.
    ///
    /// A declaration that does not parse is still answered with `shop_end`.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CreateShop => "m_shop", pass_non_parseable {
        #[index(0)]
        pub kind: u8,
        #[index(1, remove_separator)]
        pub items: Vec<ShopItem>,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct NpcRequest => "npc_req" {
        #[index(0)]
        pub kind: u8,
        #[index(1)]
        pub owner_id: i64,
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ShopEntry => "shop_entry" {
        #[index(0)]
        pub slot: i16,
        #[index(1)]
        pub amount: u8,
        #[index(2)]
        pub price: i64,
    }
}

packet! {
    /// Shop contents, one `slot.amount.price` block per listing.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ShopInventory => "n_inv" {
        #[index(0)]
        pub kind: u8,
        #[index(1)]
        pub owner_id: i64,
        #[index(3)]
        pub entries: Vec<ShopEntry>,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ShopMemo => "s_memo" {
        #[index(0)]
        pub kind: MemoKind,
        #[index(1, serialize_to_end)]
        pub message: String,
    }
}

packet! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Gold => "gold" {
        #[index(0)]
        pub amount: i64,
        #[index(1)]
        pub max_display: u8,
    }
}

packet_family! {
    pub struct ShopPackets {
        BuyPacket,
        SellPacket,
        CreateShop,
        NpcRequest,
        ShopInventory,
        ShopMemo,
        Gold,
    }
}

impl ShopMemo {
    pub fn new(kind: MemoKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
