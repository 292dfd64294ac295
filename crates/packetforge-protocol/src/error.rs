//! Error types for the protocol layer.
//!
//! Two families live here. `MissingHeader` and `DuplicateIndex` are
//! configuration errors raised while a packet schema is built; they mean a
//! packet type is declared wrong and are meant to fail fast at startup.
//! Everything else describes one bad message and is recoverable: the
//! message is dropped and the connection carries on.

/// Errors that can occur while building schemas or converting packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A packet type declared an empty header token.
    #[error("packet header cannot be empty (packet type `{type_name}`)")]
    MissingHeader { type_name: &'static str },

    /// Two fields of one packet type share a wire index.
    #[error("packet type `{type_name}` declares index {index} more than once")]
    DuplicateIndex { type_name: &'static str, index: u16 },

    /// A token could not be converted to the field's type.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A number that names no member of the target enum.
    #[error("value `{value}` is not a member of `{enum_name}`")]
    UnknownEnumValue {
        enum_name: &'static str,
        value: String,
    },

    /// A separator-less sub-packet list whose token count does not divide
    /// into whole elements.
    #[error(
        "{tokens} tokens cannot be split into sub-packets of {field_count} fields"
    )]
    MalformedList { tokens: usize, field_count: usize },

    /// A record value does not fit the kind the schema declares for it.
    #[error("field {index} holds a value that does not match its `{expected}` kind")]
    TypeMismatch { index: u16, expected: &'static str },

    /// A record has no value for a field the schema declares.
    #[error("record has no value for field {index}")]
    MissingField { index: u16 },

    /// A value was assigned to an index the packet type does not declare.
    #[error("packet type has no field at index {index}")]
    UnknownField { index: u16 },
}

impl ProtocolError {
    /// Returns `true` for errors caused by a packet type's declaration
    /// rather than by a single message.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader { .. } | Self::DuplicateIndex { .. }
        )
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord(reason.into())
    }
}
