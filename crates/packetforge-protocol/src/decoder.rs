//! Wire text → record.

use crate::schema::{FieldKind, PacketRef, PacketSchema, Placement, ScalarKind};
use crate::tokenizer::{tokenize, Token};
use crate::value::{Record, Value};
use crate::{ProtocolError, SchemaRegistry};

/// Where a field's token sits in the message, for the rules that need the
/// neighbouring tokens.
#[derive(Clone, Copy)]
struct Slot<'t, 'a> {
    tokens: &'t [Token<'a>],
    position: usize,
}

/// Decodes `text` against `schema`.
///
/// Field `n` is read from token `n + 1`, or `n + 2` when the message starts
/// with a sequence counter. A message shorter than the schema is fine: the
/// missing trailing fields are simply not in the returned record.
///
/// # Errors
/// [`ProtocolError::MalformedRecord`] or [`ProtocolError::MalformedList`]
/// when a token cannot be converted. Unknown enum values are not errors:
/// they are logged and left absent.
pub fn decode_record(
    text: &str,
    schema: &PacketSchema,
    registry: &SchemaRegistry,
    includes_leading_counter: bool,
) -> Result<Record, ProtocolError> {
    let tokens = tokenize(text);
    let skip = if includes_leading_counter { 2 } else { 1 };
    let mut record = Record::new();

    for field in schema.fields() {
        let position = usize::from(field.index) + skip;
        let Some(token) = tokens.get(position) else {
            break;
        };
        let slot = Some(Slot {
            tokens: &tokens,
            position,
        });

        if field.serialize_to_end {
            let rest = &text[token.start..];
            let value = decode_value(rest, &field.kind, Placement::from(field), slot, registry)?;
            record.insert(field.index, value);
            break;
        }

        let value = decode_value(token.text, &field.kind, Placement::from(field), slot, registry)?;
        record.insert(field.index, value);
    }

    Ok(record)
}

fn is_sentinel(raw: &str) -> bool {
    raw == "-1" || raw == "-"
}

fn decode_value(
    raw: &str,
    kind: &FieldKind,
    placement: Placement,
    slot: Option<Slot<'_, '_>>,
    registry: &SchemaRegistry,
) -> Result<Value, ProtocolError> {
    match kind {
        // Anything but "0" is true, the sentinels included.
        FieldKind::Bool => Ok(Value::Bool(raw != "0")),
        FieldKind::Nullable(_) | FieldKind::Enum(_) | FieldKind::Scalar(_)
            if is_sentinel(raw) =>
        {
            Ok(Value::Absent)
        }
        FieldKind::Nullable(inner) => decode_value(raw, inner, placement, slot, registry),
        FieldKind::Enum(info) => match raw.parse::<i64>() {
            Ok(value) if info.contains(value) => Ok(Value::Enum(value)),
            _ => {
                tracing::warn!(
                    value = raw,
                    enum_name = info.name,
                    "could not convert value to enum member, using default"
                );
                Ok(Value::Absent)
            }
        },
        FieldKind::SubPacket(packet) => match slot {
            Some(slot) if placement.remove_separator => {
                let width = registry.schema_of_ref(*packet)?.field_count();
                let end = slot.position + width;
                let Some(parts) = slot.tokens.get(slot.position..end) else {
                    return Err(ProtocolError::malformed(format!(
                        "sub-packet `{}` needs {width} tokens",
                        packet.header()
                    )));
                };
                decode_sub_packet(&join_dotted(parts), *packet, false, registry)
            }
            _ => decode_sub_packet(raw, *packet, placement.return_packet, registry),
        },
        FieldKind::SubPacketList(packet) => {
            decode_sub_packet_list(raw, *packet, placement, slot, registry)
        }
        FieldKind::ScalarList(element) => raw
            .split('.')
            .map(|piece| decode_value(piece, element, Placement::default(), None, registry))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        FieldKind::Scalar(scalar) => decode_scalar(raw, *scalar),
    }
}

fn decode_scalar(raw: &str, kind: ScalarKind) -> Result<Value, ProtocolError> {
    let parsed = match kind {
        ScalarKind::Signed => raw.parse().map(Value::Int).ok(),
        ScalarKind::Unsigned => raw.parse().map(Value::UInt).ok(),
        ScalarKind::Float => raw.parse().map(Value::Float).ok(),
        ScalarKind::Text => Some(Value::Text(raw.to_owned())),
    };
    parsed.ok_or_else(|| ProtocolError::malformed(format!("`{raw}` is not a valid {kind:?} value")))
}

/// Decodes one block: `a.b.c`, or `#header^a^b^c` for a return packet
/// whose header takes the first slot.
fn decode_sub_packet(
    raw: &str,
    packet: PacketRef,
    return_packet: bool,
    registry: &SchemaRegistry,
) -> Result<Value, ProtocolError> {
    let schema = registry.schema_of_ref(packet)?;
    let parts: Vec<&str> = raw.split(if return_packet { '^' } else { '.' }).collect();
    let shift = usize::from(return_packet);

    let mut record = Record::new();
    for field in schema.fields() {
        let Some(part) = parts.get(usize::from(field.index) + shift) else {
            return Err(ProtocolError::malformed(format!(
                "sub-packet `{}` has no value for field {} in `{raw}`",
                schema.header(),
                field.index
            )));
        };
        let value = decode_value(part, &field.kind, Placement::default(), None, registry)?;
        record.insert(field.index, value);
    }
    Ok(Value::Record(record))
}

fn decode_sub_packet_list(
    raw: &str,
    packet: PacketRef,
    placement: Placement,
    slot: Option<Slot<'_, '_>>,
    registry: &SchemaRegistry,
) -> Result<Value, ProtocolError> {
    if !placement.remove_separator {
        return raw
            .split_whitespace()
            .map(|block| decode_sub_packet(block, packet, false, registry))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List);
    }

    // Without separators the elements are regrouped from the tokens that
    // follow, a fixed number of tokens per element.
    let Some(slot) = slot else {
        return Ok(Value::List(Vec::new()));
    };
    let field_count = registry.schema_of_ref(packet)?.field_count();
    let remaining = &slot.tokens[slot.position..];
    if field_count == 0 || remaining.len() % field_count != 0 {
        return Err(ProtocolError::MalformedList {
            tokens: remaining.len(),
            field_count,
        });
    }

    remaining
        .chunks(field_count)
        .map(|chunk| decode_sub_packet(&join_dotted(chunk), packet, false, registry))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

fn join_dotted(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .map(|t| t.text)
        .collect::<Vec<_>>()
        .join(".")
}
