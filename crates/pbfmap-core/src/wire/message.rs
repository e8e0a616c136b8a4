//! Decoded messages as ordered field collections.
//!
//! A [`Message`] keeps every field in the order it was encountered on the
//! wire. Two lookups with different semantics exist side by side:
//!
//! - [`Message::find_last`] returns the last occurrence of a field, which is
//!   how singular fields resolve when a writer emits them more than once.
//! - [`Message::find_first`] starts a positional walk over a repeated field,
//!   continued with [`FieldRef::next_match`].

use super::varint::{zigzag, WireType};
use bytes::Bytes;
use std::ops::Deref;

/// The value carried by a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Varint value, uninterpreted
    Varint(u64),
    /// Little-endian 64-bit fixed value
    Fixed64(u64),
    /// Little-endian 32-bit fixed value
    Fixed32(u32),
    /// Length-delimited payload
    Bytes(Bytes),
    /// Group start marker
    StartGroup,
    /// Group end marker
    EndGroup,
}

impl FieldValue {
    /// Wire type this value was encoded with
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::Fixed64(_) => WireType::I64,
            FieldValue::Fixed32(_) => WireType::I32,
            FieldValue::Bytes(_) => WireType::Len,
            FieldValue::StartGroup => WireType::StartGroup,
            FieldValue::EndGroup => WireType::EndGroup,
        }
    }

    /// Returns the raw varint value
    pub fn as_varint(&self) -> Option<u64> {
        match *self {
            FieldValue::Varint(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the raw fixed32 value
    pub fn as_fixed32(&self) -> Option<u32> {
        match *self {
            FieldValue::Fixed32(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the raw fixed64 value
    pub fn as_fixed64(&self) -> Option<u64> {
        match *self {
            FieldValue::Fixed64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the payload of a length-delimited value
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Interprets a varint as a zigzag-encoded `sint64`
    pub fn as_sint64(&self) -> Option<i64> {
        self.as_varint().map(zigzag)
    }

    /// Interprets a numeric value as a two's complement signed integer.
    ///
    /// Varints and fixed64 values are reinterpreted as `i64`; fixed32 values
    /// are sign-extended from 32 bits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Varint(v) | FieldValue::Fixed64(v) => Some(v as i64),
            FieldValue::Fixed32(v) => Some(i64::from(v as i32)),
            _ => None,
        }
    }
}

/// A single decoded field record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field number from the tag
    pub number: u32,
    /// Decoded value
    pub value: FieldValue,
}

impl Field {
    /// Creates a new field record
    pub fn new(number: u32, value: FieldValue) -> Self {
        Self { number, value }
    }

    /// Wire type of the value
    pub fn wire_type(&self) -> WireType {
        self.value.wire_type()
    }
}

/// Wire type constraint used by field lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireTypeFilter {
    /// Match on field number alone
    Any,
    /// Match only fields with this wire type
    Exact(WireType),
}

impl WireTypeFilter {
    /// Returns true if a field of the given wire type passes the filter
    pub fn matches(self, wire_type: WireType) -> bool {
        match self {
            WireTypeFilter::Any => true,
            WireTypeFilter::Exact(expected) => expected == wire_type,
        }
    }
}

impl From<WireType> for WireTypeFilter {
    fn from(wire_type: WireType) -> Self {
        WireTypeFilter::Exact(wire_type)
    }
}

/// Walk direction for [`Message::next_match`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the end of the message
    Forward,
    /// Towards the start of the message
    Backward,
}

/// One decoded message: its fields in wire order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<Field>,
}

impl Message {
    /// Creates an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of field records
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field at a position
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// All fields in wire order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Iterates over all fields in wire order
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub(crate) fn replace_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }

    /// Returns the last field matching `number` and `filter`.
    pub fn find_last(&self, number: u32, filter: impl Into<WireTypeFilter>) -> Option<&Field> {
        let filter = filter.into();
        self.fields
            .iter()
            .rev()
            .find(|f| f.number == number && filter.matches(f.wire_type()))
    }

    /// Returns the first field matching `number` and `filter`.
    pub fn find_first(
        &self,
        number: u32,
        filter: impl Into<WireTypeFilter>,
    ) -> Option<FieldRef<'_>> {
        let filter = filter.into();
        self.fields
            .iter()
            .position(|f| f.number == number && filter.matches(f.wire_type()))
            .map(|index| FieldRef {
                message: self,
                index,
            })
    }

    /// Continues a walk from the field at `from`.
    ///
    /// Returns `None` at either end of the message, or when the next field
    /// with this number has a wire type the filter rejects.
    pub fn next_match(
        &self,
        from: usize,
        number: u32,
        filter: impl Into<WireTypeFilter>,
        direction: Direction,
    ) -> Option<FieldRef<'_>> {
        let filter = filter.into();
        let mut index = from;

        loop {
            index = match direction {
                Direction::Forward => index.checked_add(1).filter(|&i| i < self.fields.len())?,
                Direction::Backward => index.checked_sub(1)?,
            };

            let field = self.fields.get(index)?;
            if field.number != number {
                continue;
            }

            return filter.matches(field.wire_type()).then_some(FieldRef {
                message: self,
                index,
            });
        }
    }

    /// Forward walk over a repeated field: [`find_first`](Self::find_first)
    /// followed by [`next_match`](Self::next_match).
    pub fn matching(&self, number: u32, filter: impl Into<WireTypeFilter>) -> Matching<'_> {
        let filter = filter.into();
        Matching {
            next: self.find_first(number, filter),
            number,
            filter,
        }
    }

    /// Counts every field matching `number` and `filter`
    pub fn count(&self, number: u32, filter: impl Into<WireTypeFilter>) -> usize {
        let filter = filter.into();
        self.fields
            .iter()
            .filter(|f| f.number == number && filter.matches(f.wire_type()))
            .count()
    }
}

impl From<Vec<Field>> for Message {
    fn from(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A positioned reference to a field inside a message
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    message: &'a Message,
    index: usize,
}

impl<'a> FieldRef<'a> {
    /// Position of the field in its message
    pub fn index(&self) -> usize {
        self.index
    }

    /// The referenced field
    pub fn field(&self) -> &'a Field {
        &self.message.fields[self.index]
    }

    /// Next matching field in `direction`, see [`Message::next_match`]
    pub fn next_match(
        self,
        number: u32,
        filter: impl Into<WireTypeFilter>,
        direction: Direction,
    ) -> Option<FieldRef<'a>> {
        self.message
            .next_match(self.index, number, filter, direction)
    }
}

impl Deref for FieldRef<'_> {
    type Target = Field;

    fn deref(&self) -> &Field {
        self.field()
    }
}

/// Iterator returned by [`Message::matching`]
#[derive(Debug, Clone)]
pub struct Matching<'a> {
    next: Option<FieldRef<'a>>,
    number: u32,
    filter: WireTypeFilter,
}

impl<'a> Iterator for Matching<'a> {
    type Item = &'a Field;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.next_match(self.number, self.filter, Direction::Forward);
        Some(current.field())
    }
}
