//! Streaming wire format reader.
//!
//! [`WireReader`] pulls tags and values from any [`Read`] source and keeps
//! track of its absolute byte offset so every error can say where the
//! input went wrong. A clean end of input before the first byte of a tag
//! or length prefix is reported as `Ok(None)`; running out anywhere else
//! is [`Error::TruncatedInput`].

use super::message::{Field, FieldValue, Message};
use super::varint::{WireType, MAX_FIELD_NUMBER, MAX_VARINT_LEN};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::{ErrorKind, Read};

/// A decoded field tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Field number (tag >> 3)
    pub number: u32,
    /// Wire type (tag & 0x7)
    pub wire_type: WireType,
}

/// Byte window a message must be decoded within
#[derive(Debug, Clone, Copy)]
struct Budget {
    start: u64,
    end: u64,
}

impl Budget {
    fn violation(&self, reached: u64) -> Error {
        Error::BudgetViolation {
            budget: self.end - self.start,
            consumed: reached - self.start,
        }
    }
}

/// Reads protobuf wire format from a byte stream
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> WireReader<R> {
    /// Creates a reader positioned at offset 0
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.position += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn fill(&mut self, buf: &mut [u8], context: &'static str) -> Result<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(Error::truncated(self.position, context))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a varint, returning `None` if the input ends before its first byte.
    pub fn read_varint(&mut self, context: &'static str) -> Result<Option<u64>> {
        let start = self.position;
        let mut result: u64 = 0;

        for i in 0..MAX_VARINT_LEN {
            let Some(byte) = self.read_byte()? else {
                if i == 0 {
                    return Ok(None);
                }
                return Err(Error::truncated(self.position, context));
            };

            result |= u64::from(byte & 0x7F) << (7 * i);

            if byte & 0x80 == 0 {
                return Ok(Some(result));
            }
        }

        Err(Error::malformed_varint(start))
    }

    fn require_varint(&mut self, context: &'static str) -> Result<u64> {
        self.read_varint(context)?
            .ok_or_else(|| Error::truncated(self.position, context))
    }

    /// Reads a big-endian 32-bit length prefix.
    ///
    /// Returns `None` on a clean end of input before the first byte.
    pub fn read_length_prefix(&mut self) -> Result<Option<u32>> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };

        let mut rest = [0u8; 3];
        self.fill(&mut rest, "blob length prefix")?;

        Ok(Some(u32::from_be_bytes([first, rest[0], rest[1], rest[2]])))
    }

    /// Reads a field tag, returning `None` at a clean end of input.
    pub fn read_tag(&mut self) -> Result<Option<Tag>> {
        let offset = self.position;
        let Some(raw) = self.read_varint("field tag")? else {
            return Ok(None);
        };

        let bits = (raw & 0x07) as u8;
        let wire_type =
            WireType::from_bits(bits).ok_or(Error::InvalidWireType { offset, value: bits })?;

        let number = raw >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(Error::InvalidFieldNumber {
                offset,
                number,
                max: MAX_FIELD_NUMBER,
            });
        }

        Ok(Some(Tag {
            number: number as u32,
            wire_type,
        }))
    }

    /// Reads the value that follows a tag of the given wire type.
    pub fn read_value(&mut self, wire_type: WireType) -> Result<FieldValue> {
        self.read_value_within(wire_type, None)
    }

    fn read_value_within(
        &mut self,
        wire_type: WireType,
        budget: Option<Budget>,
    ) -> Result<FieldValue> {
        match wire_type {
            WireType::Varint => Ok(FieldValue::Varint(self.require_varint("varint value")?)),
            WireType::I64 => {
                let mut buf = [0u8; 8];
                self.fill(&mut buf, "fixed64 value")?;
                Ok(FieldValue::Fixed64(u64::from_le_bytes(buf)))
            }
            WireType::I32 => {
                let mut buf = [0u8; 4];
                self.fill(&mut buf, "fixed32 value")?;
                Ok(FieldValue::Fixed32(u32::from_le_bytes(buf)))
            }
            WireType::Len => {
                let len = self.require_varint("length prefix")?;

                if let Some(budget) = budget {
                    let reached = self.position.saturating_add(len);
                    if reached > budget.end {
                        return Err(budget.violation(reached));
                    }
                }

                let mut buf = Vec::new();
                let read = self.inner.by_ref().take(len).read_to_end(&mut buf)?;
                self.position += read as u64;

                if (read as u64) < len {
                    return Err(Error::truncated(self.position, "length-delimited value"));
                }
                Ok(FieldValue::Bytes(Bytes::from(buf)))
            }
            WireType::StartGroup => Ok(FieldValue::StartGroup),
            WireType::EndGroup => Ok(FieldValue::EndGroup),
        }
    }

    /// Reads one complete field, returning `None` at a clean end of input.
    pub fn read_field(&mut self) -> Result<Option<Field>> {
        let Some(tag) = self.read_tag()? else {
            return Ok(None);
        };
        let value = self.read_value(tag.wire_type)?;
        Ok(Some(Field::new(tag.number, value)))
    }

    /// Reads fields until exactly `budget` bytes have been consumed.
    ///
    /// Returns `None` when the budget is zero or the input ends cleanly
    /// before the first field, which lets callers tell "nothing left" apart
    /// from a message cut short.
    pub fn read_message(&mut self, budget: u64) -> Result<Option<Message>> {
        let window = Budget {
            start: self.position,
            end: self.position.saturating_add(budget),
        };
        let mut fields = Vec::new();

        while self.position < window.end {
            let Some(tag) = self.read_tag()? else {
                if fields.is_empty() {
                    return Ok(None);
                }
                return Err(Error::truncated(self.position, "message field"));
            };

            let value = self.read_value_within(tag.wire_type, Some(window))?;
            fields.push(Field::new(tag.number, value));
        }

        if self.position > window.end {
            return Err(window.violation(self.position));
        }

        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Message::from(fields)))
    }
}
