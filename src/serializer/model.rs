//! Declarative record codec.
//!
//! Every FTMS characteristic is described as an ordered table of [`Field`]s
//! carrying the wire spec plus metadata: the realtime-features bit that
//! gates whether a machine reports the field, the selector code of
//! code-switched records and the element count of fixed-length sequences.
//! Two framing modes exist on top of the tables: bitmask-gated records
//! (realtime data) and code-switched records (control requests, machine
//! status). Decoding always produces a flat name-to-value map.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::{FtmsError, Result};
use crate::models::common::IndoorBikeSimulationParameters;

use super::{FieldMap, NumSerializer, Value};

/// One declared field of a record.
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Bit in the realtime-features bitmap gating whether the machine
    /// reports this field at all.
    pub feature_bit: Option<u8>,
    /// Selector value in a code-switched record.
    pub code: Option<u8>,
}

#[derive(Debug)]
pub enum FieldKind {
    /// Scalar with a number spec.
    Num(&'static str),
    /// Fixed-length sequence of u16 values.
    Seq { spec: &'static str, len: usize },
    /// Nested field group occupying the sum of its leaf sizes.
    Group(&'static [Field]),
}

impl Field {
    pub const fn num(name: &'static str, spec: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Num(spec),
            feature_bit: None,
            code: None,
        }
    }

    pub const fn seq(name: &'static str, spec: &'static str, len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::Seq { spec, len },
            feature_bit: None,
            code: None,
        }
    }

    pub const fn group(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            kind: FieldKind::Group(fields),
            feature_bit: None,
            code: None,
        }
    }

    pub const fn feature(mut self, bit: u8) -> Self {
        self.feature_bit = Some(bit);
        self
    }

    pub const fn code(mut self, code: u8) -> Self {
        self.code = Some(code);
        self
    }
}

/// A decoded bitmask-gated record.
#[derive(Debug)]
pub struct BitmaskFrame {
    /// The raw flags word.
    pub mask: u16,
    /// Bit 0 of the mask: this record continues in the next notification.
    pub more_data: bool,
    pub values: FieldMap,
}

/// Decodes a bitmask-gated record.
///
/// The first two bytes are a little-endian flags word. Bit 0 is the
/// `More Data` continuation flag; inverting it makes the word a plain
/// present-bit per declared field, in order, starting with the default
/// field that is present whenever `More Data` is clear. Iteration stops
/// once no gate bits remain, and the payload must then be fully consumed.
pub fn decode_bitmask_frame(fields: &[Field], data: &[u8]) -> Result<BitmaskFrame> {
    let mut src = Cursor::new(data);

    let mask = src.read_u16::<LittleEndian>().map_err(|_| FtmsError::Eof)?;
    let more_data = mask & 1 != 0;

    let mut gates = mask ^ 1;
    let mut values = FieldMap::new();

    for field in fields {
        if gates & 1 != 0 {
            decode_field_into(field, &mut src, &mut values)?;
        }

        gates >>= 1;

        if gates == 0 {
            break;
        }
    }

    ensure_exhausted(&mut src)?;

    Ok(BitmaskFrame {
        mask,
        more_data,
        values,
    })
}

/// A decoded code-switched record: the code byte plus at most one
/// selected payload field.
#[derive(Debug)]
pub struct CodeSwitchRecord {
    pub code: u8,
    pub setting: Option<(&'static str, Value)>,
}

/// Decodes a code-switched record against a table whose first entry is the
/// code field itself. The remaining bytes select the single field whose
/// `code` metadata matches, and the record must be fully consumed.
pub fn decode_code_switched(fields: &[Field], data: &[u8]) -> Result<CodeSwitchRecord> {
    let mut src = Cursor::new(data);

    let code = src.read_u8().map_err(|_| FtmsError::Eof)?;

    let mut setting = None;

    for field in fields.iter().skip(1) {
        if field.code != Some(code) {
            continue;
        }

        let value = match &field.kind {
            FieldKind::Num(spec) => NumSerializer::parse(spec)?.decode(&mut src)?,
            FieldKind::Seq { spec, len } => Some(decode_seq(spec, *len, &mut src)?),
            FieldKind::Group(group) => {
                let mut map = FieldMap::new();

                for f in group.iter() {
                    decode_field_into(f, &mut src, &mut map)?;
                }

                IndoorBikeSimulationParameters::from_field_map(&map).map(Value::Simulation)
            }
        };

        setting = value.map(|v| (strip_arity_suffix(field.name), v));
        break;
    }

    ensure_exhausted(&mut src)?;

    Ok(CodeSwitchRecord { code, setting })
}

/// Leaf field names the given realtime-features bitmap allows the machine
/// to report. Group gating applies to every leaf of the group. The first
/// collected name is skipped: it is the code field of code-switched
/// records, respectively the always-present default field of realtime
/// records.
pub fn supported_fields(fields: &'static [Field], features: u32) -> Vec<&'static str> {
    let mut out = Vec::new();

    collect_supported(fields, features, &mut out);

    if !out.is_empty() {
        out.remove(0);
    }

    out
}

fn collect_supported(fields: &[Field], features: u32, out: &mut Vec<&'static str>) {
    for field in fields {
        if let Some(bit) = field.feature_bit {
            if bit >= 32 || features & (1 << bit) == 0 {
                continue;
            }
        }

        match &field.kind {
            FieldKind::Group(group) => collect_supported(group, features, out),
            _ => out.push(field.name),
        }
    }
}

/// `target_time_2` and friends share the public name `target_time`; the
/// arity stays visible through the sequence length.
pub fn strip_arity_suffix(name: &'static str) -> &'static str {
    match name.as_bytes().last() {
        Some(b) if b.is_ascii_digit() => &name[..name.len() - 2],
        _ => name,
    }
}

fn decode_field_into(field: &Field, src: &mut Cursor<&[u8]>, out: &mut FieldMap) -> Result<()> {
    match &field.kind {
        FieldKind::Num(spec) => {
            if let Some(value) = NumSerializer::parse(spec)?.decode(src)? {
                out.insert(field.name, value);
            }
        }
        FieldKind::Seq { spec, len } => {
            out.insert(field.name, decode_seq(spec, *len, src)?);
        }
        FieldKind::Group(group) => {
            for f in group.iter() {
                decode_field_into(f, src, out)?;
            }
        }
    }

    Ok(())
}

fn decode_seq(spec: &str, len: usize, src: &mut Cursor<&[u8]>) -> Result<Value> {
    let serializer = NumSerializer::parse(spec)?;
    let mut items = Vec::with_capacity(len);

    for _ in 0..len {
        let item = match serializer.decode(src)? {
            Some(Value::UInt(v)) => v as u16,
            _ => 0,
        };

        items.push(item);
    }

    Ok(Value::Seq(items))
}

fn ensure_exhausted(src: &mut Cursor<&[u8]>) -> Result<()> {
    let mut one = [0u8; 1];

    match src.read(&mut one) {
        Ok(0) => Ok(()),
        _ => Err(FtmsError::InvalidFormat("trailing bytes in record")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNER: &[Field] = &[Field::num("inner_a", "u1"), Field::num("inner_b", "u1")];

    const FIELDS: &[Field] = &[
        Field::num("first", "u2.01"),
        Field::num("second", "u1").feature(1),
        Field::group("pair", INNER).feature(2),
        Field::num("third", "u2"),
    ];

    #[test]
    fn default_field_is_gated_by_inverted_bit_zero() {
        // Mask 0x0000: bit 0 inverted selects only the default field.
        let frame = decode_bitmask_frame(FIELDS, &[0x00, 0x00, 0x90, 0x01]).unwrap();

        assert!(!frame.more_data);
        assert_eq!(frame.values.len(), 1);
        assert_eq!(frame.values["first"], Value::Float(4.0));
    }

    #[test]
    fn continuation_frame_without_default_field() {
        // Mask 0x0003: More Data set, bit 1 selects "second".
        let frame = decode_bitmask_frame(FIELDS, &[0x03, 0x00, 0x2A]).unwrap();

        assert!(frame.more_data);
        assert_eq!(frame.values.len(), 1);
        assert_eq!(frame.values["second"], Value::UInt(42));
    }

    #[test]
    fn group_occupies_one_mask_bit() {
        let frame = decode_bitmask_frame(FIELDS, &[0x04, 0x00, 0x05, 0x00, 0x01, 0x02]).unwrap();

        assert_eq!(frame.values["first"], Value::Float(0.05));
        assert_eq!(frame.values["inner_a"], Value::UInt(1));
        assert_eq!(frame.values["inner_b"], Value::UInt(2));
    }

    #[test]
    fn absent_fields_are_omitted() {
        let frame = decode_bitmask_frame(FIELDS, &[0x02, 0x00, 0xFF, 0xFF, 0x7B]).unwrap();

        // Sentinel "first" dropped, concrete "second" kept.
        assert_eq!(frame.values.len(), 1);
        assert_eq!(frame.values["second"], Value::UInt(123));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = decode_bitmask_frame(FIELDS, &[0x00, 0x00, 0x90, 0x01, 0xAA]).unwrap_err();

        assert!(matches!(err, FtmsError::InvalidFormat(_)));
    }

    #[test]
    fn truncated_payload_is_eof() {
        assert!(matches!(
            decode_bitmask_frame(FIELDS, &[0x00, 0x00, 0x90]),
            Err(FtmsError::Eof)
        ));
    }

    #[test]
    fn supported_fields_skip_the_default_field() {
        assert_eq!(supported_fields(FIELDS, 0), vec!["third"]);
        assert_eq!(
            supported_fields(FIELDS, 0b110),
            vec!["second", "inner_a", "inner_b", "third"]
        );
    }

    #[test]
    fn arity_suffix_stripping() {
        assert_eq!(strip_arity_suffix("target_time_2"), "target_time");
        assert_eq!(strip_arity_suffix("target_speed"), "target_speed");
    }
}
