//! Schema model: what a packet looks like on the wire.
//!
//! A [`PacketSchema`] is the header token plus an ordered list of
//! [`FieldDescriptor`]s. Each descriptor carries a [`FieldKind`], a closed
//! set of shapes with exactly one encode rule and one decode rule each, so
//! the codec never has to inspect a Rust type at runtime.

use std::any::TypeId;
use std::fmt;

use crate::{Packet, ProtocolError};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The textual representation of a plain scalar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// A signed integer, parsed into `i64`.
    Signed,
    /// An unsigned integer, parsed into `u64`.
    Unsigned,
    /// A floating point number.
    Float,
    /// A string token, kept verbatim.
    Text,
}

/// Static description of an integer-backed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumInfo {
    /// Rust type name, used in log output.
    pub name: &'static str,
    /// Discriminants of every declared member.
    pub members: &'static [i64],
}

impl EnumInfo {
    /// Returns `true` if `value` is the discriminant of a declared member.
    pub fn contains(&self, value: i64) -> bool {
        self.members.contains(&value)
    }
}

/// How a field is laid out on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A single token holding a number or a string.
    Scalar(ScalarKind),
    /// `0` or `1`.
    Bool,
    /// An enum written as its integer discriminant.
    Enum(EnumInfo),
    /// A value that may be absent, written as `-1` when it is.
    Nullable(Box<FieldKind>),
    /// Scalars joined with `.` into one token.
    ScalarList(Box<FieldKind>),
    /// A nested packet written into one token.
    SubPacket(PacketRef),
    /// Nested packets written back to back.
    SubPacketList(PacketRef),
}

impl FieldKind {
    /// Short name of the kind, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar(ScalarKind::Signed) => "signed",
            Self::Scalar(ScalarKind::Unsigned) => "unsigned",
            Self::Scalar(ScalarKind::Float) => "float",
            Self::Scalar(ScalarKind::Text) => "text",
            Self::Bool => "bool",
            Self::Enum(_) => "enum",
            Self::Nullable(_) => "nullable",
            Self::ScalarList(_) => "scalar list",
            Self::SubPacket(_) => "sub-packet",
            Self::SubPacketList(_) => "sub-packet list",
        }
    }
}

/// Header-level flags of a packet declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketOptions {
    /// Handlers still see messages of this type that fail to decode.
    pub pass_non_parseable: bool,
}

impl PacketOptions {
    /// No flags set.
    pub const fn new() -> Self {
        Self {
            pass_non_parseable: false,
        }
    }

    /// Lets undecodable messages through to a raw handler.
    pub const fn pass_non_parseable(mut self) -> Self {
        self.pass_non_parseable = true;
        self
    }
}

/// A handle to a packet type, usable where the type is only known at
/// runtime (nested fields, registry lookups).
#[derive(Clone, Copy)]
pub struct PacketRef {
    type_id: fn() -> TypeId,
    type_name: &'static str,
    header: &'static str,
    describe: fn() -> Vec<FieldDescriptor>,
    options: fn() -> PacketOptions,
}

impl PacketRef {
    /// The handle for packet type `P`.
    pub fn of<P: Packet>() -> Self {
        Self {
            type_id: TypeId::of::<P>,
            type_name: std::any::type_name::<P>(),
            header: P::HEADER,
            describe: P::describe,
            options: P::options,
        }
    }

    /// The `TypeId` of the packet type.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// The Rust type name of the packet type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The declared header token.
    pub fn header(&self) -> &'static str {
        self.header
    }

    /// The header-level flags of the declaration.
    pub fn options(&self) -> PacketOptions {
        (self.options)()
    }

    /// Returns `true` if undecodable messages of this type still reach a
    /// handler.
    pub fn pass_non_parseable(&self) -> bool {
        self.options().pass_non_parseable
    }

    /// Builds the schema of the referenced type from its declaration.
    pub fn build_schema(&self) -> Result<PacketSchema, ProtocolError> {
        Ok(PacketSchema::build(self.type_name, self.header, (self.describe)())?
            .with_options(self.options()))
    }
}

impl PartialEq for PacketRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl fmt::Debug for PacketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketRef")
            .field("type_name", &self.type_name)
            .field("header", &self.header)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// One field of a packet schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Position of the field after the header token.
    pub index: u16,
    /// Rust field name, for diagnostics.
    pub name: &'static str,
    /// Wire layout.
    pub kind: FieldKind,
    /// The field takes everything from its token to the end of the
    /// message, and processing stops after it.
    pub serialize_to_end: bool,
    /// A nested packet written as `#header^a^b` instead of `a.b`.
    pub is_return_packet: bool,
    /// Nested fields are written as separate tokens without a `.` join.
    pub remove_separator: bool,
}

impl FieldDescriptor {
    /// A field with no flags set.
    pub fn new(index: u16, name: &'static str, kind: FieldKind) -> Self {
        Self {
            index,
            name,
            kind,
            serialize_to_end: false,
            is_return_packet: false,
            remove_separator: false,
        }
    }

    /// Marks the field as consuming the rest of the message.
    pub fn serialize_to_end(mut self) -> Self {
        self.serialize_to_end = true;
        self
    }

    /// Marks a sub-packet field as a return packet.
    pub fn return_packet(mut self) -> Self {
        self.is_return_packet = true;
        self
    }

    /// Drops the `.` join between nested fields.
    pub fn remove_separator(mut self) -> Self {
        self.remove_separator = true;
        self
    }
}

/// The nesting flags of a field, as seen by the value rules. Values inside
/// a sub-packet are always written with no flags.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Placement {
    pub return_packet: bool,
    pub remove_separator: bool,
}

impl From<&FieldDescriptor> for Placement {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            return_packet: field.is_return_packet,
            remove_separator: field.remove_separator,
        }
    }
}

// ---------------------------------------------------------------------------
// PacketSchema
// ---------------------------------------------------------------------------

/// The immutable wire layout of one packet type.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketSchema {
    type_name: &'static str,
    header: &'static str,
    fields: Vec<FieldDescriptor>,
    options: PacketOptions,
}

impl PacketSchema {
    /// Validates a declaration and orders its fields by index.
    ///
    /// # Errors
    /// [`ProtocolError::MissingHeader`] for a blank header and
    /// [`ProtocolError::DuplicateIndex`] when two fields share an index.
    pub fn build(
        type_name: &'static str,
        header: &'static str,
        mut fields: Vec<FieldDescriptor>,
    ) -> Result<Self, ProtocolError> {
        if header.trim().is_empty() {
            return Err(ProtocolError::MissingHeader { type_name });
        }

        fields.sort_by_key(|f| f.index);
        if let Some(pair) = fields.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(ProtocolError::DuplicateIndex {
                type_name,
                index: pair[0].index,
            });
        }

        Ok(Self {
            type_name,
            header,
            fields,
            options: PacketOptions::new(),
        })
    }

    /// Replaces the header-level flags.
    pub fn with_options(mut self, options: PacketOptions) -> Self {
        self.options = options;
        self
    }

    /// The header token.
    pub fn header(&self) -> &'static str {
        self.header
    }

    /// The Rust type name the schema was built from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields in ascending index order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Header-level flags.
    pub fn options(&self) -> PacketOptions {
        self.options
    }

    /// Returns `true` if undecodable messages still reach a handler.
    pub fn pass_non_parseable(&self) -> bool {
        self.options.pass_non_parseable
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The field declared at `index`, if any.
    pub fn field(&self, index: u16) -> Option<&FieldDescriptor> {
        self.fields
            .binary_search_by_key(&index, |f| f.index)
            .ok()
            .map(|pos| &self.fields[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(index: u16, name: &'static str) -> FieldDescriptor {
        FieldDescriptor::new(index, name, FieldKind::Scalar(ScalarKind::Signed))
    }

    #[test]
    fn test_build_orders_fields_by_index() {
        let schema = PacketSchema::build(
            "Walk",
            "walk",
            vec![signed(2, "speed"), signed(0, "x"), signed(1, "y")],
        )
        .unwrap();

        let indices: Vec<u16> = schema.fields().iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(schema.header(), "walk");
        assert_eq!(schema.field(1).unwrap().name, "y");
        assert!(schema.field(3).is_none());
    }

    #[test]
    fn test_build_rejects_empty_header() {
        let err = PacketSchema::build("Walk", " ", vec![signed(0, "x")]).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingHeader { type_name: "Walk" }));
    }

    #[test]
    fn test_build_rejects_duplicate_index() {
        let err =
            PacketSchema::build("Walk", "walk", vec![signed(1, "x"), signed(1, "y")]).unwrap_err();
        assert!(matches!(err, ProtocolError::DuplicateIndex { index: 1, .. }));
    }

    #[test]
    fn test_descriptor_flags() {
        let field = signed(4, "message").serialize_to_end();
        assert!(field.serialize_to_end);
        assert!(!field.is_return_packet);
        assert!(!field.remove_separator);
    }

    #[test]
    fn test_options_default_to_strict_parsing() {
        let schema = PacketSchema::build("Walk", "walk", vec![signed(0, "x")]).unwrap();
        assert!(!schema.pass_non_parseable());

        let lenient = schema.with_options(PacketOptions::new().pass_non_parseable());
        assert!(lenient.pass_non_parseable());
        assert_eq!(lenient.field_count(), 1);
    }

    #[test]
    fn test_enum_info_contains() {
        let info = EnumInfo {
            name: "Mode",
            members: &[0, 1, 5],
        };
        assert!(info.contains(5));
        assert!(!info.contains(2));
    }
}
