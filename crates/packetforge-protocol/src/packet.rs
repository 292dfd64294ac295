//! Packet traits and the declaration macros that implement them.
//!
//! A packet type is declared once with [`packet!`](crate::packet): the
//! macro emits the struct, its static field table ([`Packet::describe`])
//! and the accessors the codec uses to move values in and out of it.
//!
//! ```
//! use packetforge_protocol::{packet, wire_enum, Packet};
//!
//! wire_enum! {
//!     #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
//!     pub enum UpgradeMode {
//!         #[default]
//!         Normal = 0,
//!         Reduced = 1,
//!         Free = 2,
//!     }
//! }
//!
//! packet! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct UpgradePacket => "$Upgrade" {
//!         #[index(0)]
//!         pub slot: i16,
//!         #[index(1)]
//!         pub mode: UpgradeMode,
//!     }
//! }
//!
//! assert_eq!(UpgradePacket::HEADER, "$Upgrade");
//! assert_eq!(UpgradePacket::describe().len(), 2);
//! ```

use crate::schema::{FieldDescriptor, PacketOptions, PacketRef};
use crate::value::{Record, Value};
use crate::ProtocolError;

/// A record type with a wire schema.
///
/// Implement through [`packet!`](crate::packet) rather than by hand.
pub trait Packet: Default + Send + Sync + 'static {
    /// The header token that starts every message of this type.
    const HEADER: &'static str;

    /// The field table, in declaration order.
    fn describe() -> Vec<FieldDescriptor>;

    /// Header-level flags.
    fn options() -> PacketOptions {
        PacketOptions::new()
    }

    /// Reads every declared field into a record.
    fn to_record(&self) -> Record;

    /// Assigns one field from a decoded value.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownField`] for an undeclared index, or the
    /// conversion error of the field's type.
    fn set_field(&mut self, index: u16, value: Value) -> Result<(), ProtocolError>;

    /// Builds a packet from a record. Fields the record lacks keep their
    /// default value.
    fn from_record(record: Record) -> Result<Self, ProtocolError> {
        let mut packet = Self::default();
        for (index, value) in record {
            packet.set_field(index, value)?;
        }
        Ok(packet)
    }
}

/// A named group of packet types registered together.
///
/// Declared with [`packet_family!`](crate::packet_family) and passed to
/// [`SchemaRegistry::initialize`](crate::SchemaRegistry::initialize).
pub trait PacketFamily: 'static {
    /// Every packet type in the family.
    fn members() -> Vec<PacketRef>;
}

/// Declares a packet struct and its wire schema.
///
/// Every field carries `#[index(n)]`, optionally followed by flags:
/// `serialize_to_end`, `return_packet`, `remove_separator`. The struct
/// must implement `Default`.
///
/// Header flags follow the header token, e.g.
/// `struct Upgrade => "$Upgrade", pass_non_parseable { .. }`.
#[macro_export]
macro_rules! packet {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $header:literal $(, $option:ident)* {
            $(
                $(#[doc = $doc:expr])*
                #[index($index:literal $(, $flag:ident)* $(,)?)]
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Packet for $name {
            const HEADER: &'static str = $header;

            fn options() -> $crate::PacketOptions {
                $crate::PacketOptions::new()$(.$option())*
            }

            fn describe() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                ::std::vec![$(
                    $crate::FieldDescriptor::new(
                        $index,
                        ::std::stringify!($field),
                        <$ty as $crate::WireType>::kind(),
                    )
                    $(.$flag())*
                ),*]
            }

            #[allow(unused_mut)]
            fn to_record(&self) -> $crate::Record {
                let mut record = $crate::Record::new();
                $(
                    record.insert($index, $crate::WireType::to_value(&self.$field));
                )*
                record
            }

            fn set_field(
                &mut self,
                index: u16,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::ProtocolError> {
                match index {
                    $(
                        $index => {
                            self.$field = <$ty as $crate::WireType>::from_value(value)?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::ProtocolError::UnknownField { index }),
                }
            }
        }

        impl $crate::WireType for $name {
            fn kind() -> $crate::FieldKind {
                $crate::FieldKind::SubPacket($crate::PacketRef::of::<Self>())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record($crate::Packet::to_record(self))
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::ProtocolError> {
                match value {
                    $crate::Value::Record(record) => {
                        <Self as $crate::Packet>::from_record(record)
                    }
                    $crate::Value::Absent => {
                        Ok(<Self as ::std::default::Default>::default())
                    }
                    other => Err($crate::ProtocolError::MalformedRecord(::std::format!(
                        "cannot convert {:?} to {}",
                        other,
                        ::std::stringify!($name),
                    ))),
                }
            }
        }
    };
}

/// Declares an enum that travels as its integer discriminant.
///
/// Every variant needs an explicit discriminant and the enum must
/// implement `Default`; an absent or unknown value decodes to the default.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl $crate::WireType for $name {
            fn kind() -> $crate::FieldKind {
                $crate::FieldKind::Enum($crate::EnumInfo {
                    name: ::std::stringify!($name),
                    members: &[$($value),*],
                })
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Enum(match self {
                    $( Self::$variant => $value, )*
                })
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::ProtocolError> {
                let raw: i64 = match value {
                    $crate::Value::Absent => {
                        return Ok(<Self as ::std::default::Default>::default());
                    }
                    $crate::Value::Enum(raw) | $crate::Value::Int(raw) => raw,
                    other => {
                        return Err($crate::ProtocolError::MalformedRecord(::std::format!(
                            "cannot convert {:?} to {}",
                            other,
                            ::std::stringify!($name),
                        )));
                    }
                };
                match raw {
                    $( $value => Ok(Self::$variant), )*
                    _ => Err($crate::ProtocolError::UnknownEnumValue {
                        enum_name: ::std::stringify!($name),
                        value: raw.to_string(),
                    }),
                }
            }
        }
    };
}

/// Declares a marker type naming a group of packet types.
///
/// ```
/// use packetforge_protocol::{packet, packet_family, SchemaRegistry};
///
/// packet! {
///     #[derive(Debug, Default)]
///     pub struct Rest => "rest" {
///         #[index(0)]
///         pub amount: u8,
///     }
/// }
///
/// packet_family! {
///     pub struct BasicPackets { Rest }
/// }
///
/// let registry = SchemaRegistry::new();
/// registry.initialize::<BasicPackets>().unwrap();
/// assert!(registry.lookup_header("rest").is_some());
/// ```
#[macro_export]
macro_rules! packet_family {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $($packet:ty),* $(,)? }
    ) => {
        $(#[$meta])*
        $vis struct $name;

        impl $crate::PacketFamily for $name {
            fn members() -> ::std::vec::Vec<$crate::PacketRef> {
                ::std::vec![$($crate::PacketRef::of::<$packet>()),*]
            }
        }
    };
}
