//! Record → wire text.

use std::fmt::Display;

use crate::schema::{FieldKind, PacketRef, PacketSchema, Placement, ScalarKind};
use crate::value::{Record, Value};
use crate::{ProtocolError, SchemaRegistry};

/// Encodes `record` as a message of `schema`.
///
/// Index gaps (including leading ones) are filled with `0` tokens so every
/// field lands on the position the decoder reads it from. Processing stops
/// after a `serialize_to_end` field. The registry resolves nested
/// sub-packet schemas.
///
/// # Errors
/// [`ProtocolError::MissingField`] when the record lacks a declared field,
/// [`ProtocolError::TypeMismatch`] when a value does not fit its kind.
pub fn encode_record(
    record: &Record,
    schema: &PacketSchema,
    registry: &SchemaRegistry,
) -> Result<String, ProtocolError> {
    let mut out = String::from(schema.header());
    let mut next_index: u16 = 0;

    for field in schema.fields() {
        for _ in next_index..field.index {
            out.push_str(" 0");
        }

        let value = record
            .get(field.index)
            .ok_or(ProtocolError::MissingField { index: field.index })?;
        encode_value(
            &mut out,
            field.index,
            &field.kind,
            value,
            Placement::from(field),
            registry,
        )?;

        if field.serialize_to_end {
            break;
        }
        next_index = field.index.saturating_add(1);
    }

    Ok(out)
}

fn encode_value(
    out: &mut String,
    index: u16,
    kind: &FieldKind,
    value: &Value,
    placement: Placement,
    registry: &SchemaRegistry,
) -> Result<(), ProtocolError> {
    if is_text(kind) {
        match value {
            Value::Absent => {
                out.push_str(" -");
                return Ok(());
            }
            Value::Text(text) if text.is_empty() => {
                out.push_str(" -");
                return Ok(());
            }
            _ => {}
        }
    }

    match (kind, value) {
        (FieldKind::Nullable(_), Value::Absent) => out.push_str(" -1"),
        (FieldKind::Nullable(inner), value) => {
            encode_value(out, index, inner, value, placement, registry)?;
        }
        (FieldKind::Enum(_), Value::Enum(raw)) => push_token(out, raw),
        (FieldKind::Bool, Value::Bool(flag)) => out.push_str(if *flag { " 1" } else { " 0" }),
        (FieldKind::SubPacket(packet), Value::Record(record)) => {
            encode_sub_packet(out, *packet, record, placement, registry)?;
        }
        (FieldKind::SubPacketList(packet), Value::List(items)) => {
            let element = Placement {
                return_packet: false,
                ..placement
            };
            for item in items {
                let Value::Record(record) = item else {
                    return Err(mismatch(index, kind));
                };
                encode_sub_packet(out, *packet, record, element, registry)?;
            }
        }
        (FieldKind::ScalarList(element), Value::List(items)) => {
            for (position, item) in items.iter().enumerate() {
                let mut piece = String::new();
                encode_value(&mut piece, index, element, item, Placement::default(), registry)?;
                if position == 0 {
                    out.push_str(&piece);
                } else {
                    out.push('.');
                    out.push_str(&strip_spaces(&piece));
                }
            }
        }
        (FieldKind::Scalar(ScalarKind::Signed), Value::Int(v)) => push_token(out, v),
        (FieldKind::Scalar(ScalarKind::Unsigned), Value::UInt(v)) => push_token(out, v),
        (FieldKind::Scalar(ScalarKind::Float), Value::Float(v)) => push_token(out, v),
        (FieldKind::Scalar(ScalarKind::Text), Value::Text(v)) => push_token(out, v),
        _ => return Err(mismatch(index, kind)),
    }
    Ok(())
}

/// Writes one nested packet as a single block: ` a.b.c`, ` a b c` without
/// separators, or ` #header^a^b^c` as a return packet.
fn encode_sub_packet(
    out: &mut String,
    packet: PacketRef,
    record: &Record,
    placement: Placement,
    registry: &SchemaRegistry,
) -> Result<(), ProtocolError> {
    let schema = registry.schema_of_ref(packet)?;

    if placement.return_packet {
        out.push_str(" #");
        out.push_str(schema.header());
        out.push('^');
    } else {
        out.push(' ');
    }

    for field in schema.fields() {
        if field.index != 0 {
            out.push(if placement.return_packet {
                '^'
            } else if placement.remove_separator {
                ' '
            } else {
                '.'
            });
        }

        let value = record
            .get(field.index)
            .ok_or(ProtocolError::MissingField { index: field.index })?;
        let mut piece = String::new();
        encode_value(
            &mut piece,
            field.index,
            &field.kind,
            value,
            Placement::default(),
            registry,
        )?;
        out.push_str(&strip_spaces(&piece));
    }
    Ok(())
}

fn is_text(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Scalar(ScalarKind::Text) => true,
        FieldKind::Nullable(inner) => is_text(inner),
        _ => false,
    }
}

fn push_token(out: &mut String, token: impl Display) {
    out.push(' ');
    out.push_str(&token.to_string());
}

fn strip_spaces(piece: &str) -> String {
    piece.replace(' ', "")
}

fn mismatch(index: u16, kind: &FieldKind) -> ProtocolError {
    ProtocolError::TypeMismatch {
        index,
        expected: kind.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{packet, Packet};

    packet! {
        #[derive(Debug, Default)]
        struct Gapped => "gap" {
            #[index(0)]
            first: i32,
            #[index(3)]
            last: i32,
        }
    }

    packet! {
        #[derive(Debug, Default)]
        struct Late => "late" {
            #[index(2)]
            only: u8,
        }
    }

    fn encode<P: Packet>(packet: &P) -> String {
        let registry = SchemaRegistry::new();
        let schema = registry.schema_of::<P>().unwrap();
        encode_record(&packet.to_record(), &schema, &registry).unwrap()
    }

    #[test]
    fn test_gap_is_filled_with_zeros() {
        assert_eq!(encode(&Gapped { first: 7, last: 9 }), "gap 7 0 0 9");
    }

    #[test]
    fn test_leading_gap_is_filled() {
        assert_eq!(encode(&Late { only: 4 }), "late 0 0 4");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let registry = SchemaRegistry::new();
        let schema = registry.schema_of::<Gapped>().unwrap();
        let record = Record::new().with(0, Value::Int(1));
        let err = encode_record(&record, &schema, &registry).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { index: 3 }));
    }

    #[test]
    fn test_wrong_value_kind_is_an_error() {
        let registry = SchemaRegistry::new();
        let schema = registry.schema_of::<Gapped>().unwrap();
        let record = Record::new()
            .with(0, Value::Text("seven".into()))
            .with(3, Value::Int(9));
        let err = encode_record(&record, &schema, &registry).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TypeMismatch { index: 0, expected: "signed" }
        ));
    }
}
