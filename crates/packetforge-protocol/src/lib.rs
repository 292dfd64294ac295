//! Wire protocol for packetforge.
//!
//! Game packets travel as whitespace-separated ASCII tokens, the first
//! being a header that names the packet type:
//!
//! ```text
//! $Upgrade 3 1 0
//! buy 1 9 2 5
//! ```
//!
//! This crate turns such messages into typed structs and back:
//!
//! - **Declarations** ([`packet!`], [`wire_enum!`], [`packet_family!`]):
//!   a packet type states its header and, per field, the wire index and
//!   layout flags. The macros generate the static schema table.
//! - **Registry** ([`SchemaRegistry`]): builds each schema once and shares
//!   it for the life of the process.
//! - **Codec** ([`Codec`], [`TextCodec`]): the encoder and decoder that
//!   apply a schema to a packet or a message.
//! - **Errors** ([`ProtocolError`]): configuration errors fail fast,
//!   per-message errors drop only that message.
//!
//! ```text
//! Transport (frames) → Protocol (packets) → Router (handlers)
//! ```

mod codec;
mod decoder;
mod encoder;
mod error;
mod packet;
mod registry;
mod schema;
mod tokenizer;
mod value;

pub use codec::{Codec, TextCodec};
pub use decoder::decode_record;
pub use encoder::encode_record;
pub use error::ProtocolError;
pub use packet::{Packet, PacketFamily};
pub use registry::SchemaRegistry;
pub use schema::{
    EnumInfo, FieldDescriptor, FieldKind, PacketOptions, PacketRef, PacketSchema, ScalarKind,
};
pub use tokenizer::{tokenize, Token};
pub use value::{Record, Value, WireType};
