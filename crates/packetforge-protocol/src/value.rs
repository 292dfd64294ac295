//! Dynamic values: the bridge between typed packets and the codec.
//!
//! The encoder and decoder work on [`Record`]s of [`Value`]s keyed by
//! field index. [`WireType`] converts a Rust field type to and from a
//! `Value` and reports the [`FieldKind`] it is written as.

use std::collections::BTreeMap;

use crate::schema::{FieldKind, ScalarKind};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Value and Record
// ---------------------------------------------------------------------------

/// One decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value: the `-`/`-1` sentinel, or a field missing from the wire.
    #[default]
    Absent,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// An enum discriminant.
    Enum(i64),
    List(Vec<Value>),
    /// A nested packet.
    Record(Record),
}

impl Value {
    /// Returns `true` for [`Value::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Field values of one packet, keyed by wire index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<u16, Value>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value at `index`, replacing any previous one.
    pub fn insert(&mut self, index: u16, value: Value) {
        self.fields.insert(index, value);
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, index: u16, value: Value) -> Self {
        self.insert(index, value);
        self
    }

    /// The value at `index`.
    pub fn get(&self, index: u16) -> Option<&Value> {
        self.fields.get(&index)
    }

    /// Removes and returns the value at `index`.
    pub fn take(&mut self, index: u16) -> Option<Value> {
        self.fields.remove(&index)
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Value)> {
        self.fields.iter().map(|(index, value)| (*index, value))
    }
}

impl FromIterator<(u16, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (u16, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (u16, Value);
    type IntoIter = std::collections::btree_map::IntoIter<u16, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ---------------------------------------------------------------------------
// WireType
// ---------------------------------------------------------------------------

/// A Rust type that can be a packet field.
///
/// Implemented here for integers, floats, `bool`, `String`, `Option<T>`
/// and `Vec<T>`; the [`packet!`](crate::packet) and
/// [`wire_enum!`](crate::wire_enum) macros implement it for packets and
/// enums.
pub trait WireType: Sized {
    /// How values of this type are laid out on the wire.
    fn kind() -> FieldKind;

    /// Converts to a dynamic value.
    fn to_value(&self) -> Value;

    /// Converts back from a dynamic value.
    ///
    /// # Errors
    /// [`ProtocolError::MalformedRecord`] when the value has the wrong
    /// shape or does not fit the type.
    fn from_value(value: Value) -> Result<Self, ProtocolError>;
}

fn mismatch(type_name: &str, value: &Value) -> ProtocolError {
    ProtocolError::malformed(format!("cannot convert {value:?} to {type_name}"))
}

macro_rules! signed_wire_type {
    ($($t:ty),* $(,)?) => {$(
        impl WireType for $t {
            fn kind() -> FieldKind {
                FieldKind::Scalar(ScalarKind::Signed)
            }

            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn from_value(value: Value) -> Result<Self, ProtocolError> {
                let converted = match &value {
                    Value::Int(v) => <$t>::try_from(*v).ok(),
                    Value::UInt(v) => <$t>::try_from(*v).ok(),
                    _ => None,
                };
                converted.ok_or_else(|| mismatch(stringify!($t), &value))
            }
        }
    )*};
}

macro_rules! unsigned_wire_type {
    ($($t:ty),* $(,)?) => {$(
        impl WireType for $t {
            fn kind() -> FieldKind {
                FieldKind::Scalar(ScalarKind::Unsigned)
            }

            fn to_value(&self) -> Value {
                Value::UInt(u64::from(*self))
            }

            fn from_value(value: Value) -> Result<Self, ProtocolError> {
                let converted = match &value {
                    Value::UInt(v) => <$t>::try_from(*v).ok(),
                    Value::Int(v) => <$t>::try_from(*v).ok(),
                    _ => None,
                };
                converted.ok_or_else(|| mismatch(stringify!($t), &value))
            }
        }
    )*};
}

signed_wire_type!(i8, i16, i32, i64);
unsigned_wire_type!(u8, u16, u32, u64);

impl WireType for f64 {
    fn kind() -> FieldKind {
        FieldKind::Scalar(ScalarKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl WireType for f32 {
    fn kind() -> FieldKind {
        FieldKind::Scalar(ScalarKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Float(v) => Ok(v as f32),
            other => Err(mismatch("f32", &other)),
        }
    }
}

impl WireType for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl WireType for String {
    fn kind() -> FieldKind {
        FieldKind::Scalar(ScalarKind::Text)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    /// The sentinel decodes to an empty string.
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Absent => Ok(String::new()),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl<T: WireType> WireType for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Nullable(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Absent,
        }
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Absent => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: WireType> WireType for Vec<T> {
    fn kind() -> FieldKind {
        match T::kind() {
            FieldKind::SubPacket(packet) => FieldKind::SubPacketList(packet),
            element => FieldKind::ScalarList(Box::new(element)),
        }
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(WireType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Absent => Ok(Vec::new()),
            other => Err(mismatch("list", &other)),
        }
    }
}
