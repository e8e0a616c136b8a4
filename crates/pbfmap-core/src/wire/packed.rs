//! Packed repeated field expansion.
//!
//! A packed field stores N scalars back to back inside one length-delimited
//! payload. Expansion replaces that single record with N scalar records at
//! the same position, so positional walks over the field see every element
//! in order regardless of how the writer encoded it.

use super::message::{Field, FieldValue, Message};
use super::varint::{decode_varint, WireType};
use crate::error::{Error, Result};

/// Scalar element type of a packed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedType {
    /// Back-to-back varints
    Varint,
    /// Back-to-back little-endian 32-bit values
    Fixed32,
    /// Back-to-back little-endian 64-bit values
    Fixed64,
}

impl PackedType {
    /// Wire type of the expanded records
    pub fn wire_type(self) -> WireType {
        match self {
            PackedType::Varint => WireType::Varint,
            PackedType::Fixed32 => WireType::I32,
            PackedType::Fixed64 => WireType::I64,
        }
    }
}

/// Decodes one packed record into its scalar records.
pub fn expand_field(field: &Field, ty: PackedType) -> Result<Vec<Field>> {
    let FieldValue::Bytes(payload) = &field.value else {
        return Err(Error::packed(
            field.number,
            format!("expected a length-delimited field, found {:?}", field.wire_type()),
        ));
    };

    let number = field.number;
    match ty {
        PackedType::Varint => {
            let mut out = Vec::new();
            let mut rest = &payload[..];
            while !rest.is_empty() {
                let (value, len) = decode_varint(rest).map_err(|_| {
                    Error::packed(
                        number,
                        format!(
                            "varint run does not end on the {}-byte payload boundary",
                            payload.len()
                        ),
                    )
                })?;
                out.push(Field::new(number, FieldValue::Varint(value)));
                rest = &rest[len..];
            }
            Ok(out)
        }
        PackedType::Fixed32 => {
            let chunks = exact_chunks::<4>(number, payload)?;
            Ok(chunks
                .map(|c| Field::new(number, FieldValue::Fixed32(u32::from_le_bytes(c))))
                .collect())
        }
        PackedType::Fixed64 => {
            let chunks = exact_chunks::<8>(number, payload)?;
            Ok(chunks
                .map(|c| Field::new(number, FieldValue::Fixed64(u64::from_le_bytes(c))))
                .collect())
        }
    }
}

fn exact_chunks<const N: usize>(
    number: u32,
    payload: &[u8],
) -> Result<impl Iterator<Item = [u8; N]> + '_> {
    if payload.len() % N != 0 {
        return Err(Error::packed(
            number,
            format!(
                "payload of {} bytes is not a multiple of {}",
                payload.len(),
                N
            ),
        ));
    }

    Ok(payload.chunks_exact(N).map(|chunk| {
        let mut buf = [0u8; N];
        buf.copy_from_slice(chunk);
        buf
    }))
}

impl Message {
    /// Expands every length-delimited occurrence of field `number` in place.
    ///
    /// Scalar occurrences of the same field are left untouched. The message
    /// is only modified if every occurrence expands successfully. Returns
    /// the number of scalar records produced.
    pub fn expand_packed(&mut self, number: u32, ty: PackedType) -> Result<usize> {
        let is_packed = |f: &Field| f.number == number && f.wire_type() == WireType::Len;

        if !self.iter().any(is_packed) {
            return Ok(0);
        }

        let mut expanded = Vec::with_capacity(self.len());
        let mut produced = 0;

        for field in self.iter() {
            if is_packed(field) {
                let scalars = expand_field(field, ty)?;
                produced += scalars.len();
                expanded.extend(scalars);
            } else {
                expanded.push(field.clone());
            }
        }

        self.replace_fields(expanded);
        Ok(produced)
    }
}
