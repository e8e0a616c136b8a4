//! Generic protobuf wire format decoding.
//!
//! This layer knows nothing about OpenStreetMap. It turns bytes into
//! [`Message`]s: ordered collections of typed field records that can be
//! searched by field number and wire type.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! ## Pipeline
//!
//! 1. [`WireReader`] reads tags and values from a stream
//! 2. [`Message`] holds the fields of one message in wire order
//! 3. [`Message::expand_packed`] turns packed repeated fields into scalars
//! 4. [`read_embedded`] / [`read_compressed_embedded`] decode nested payloads

mod embedded;
mod message;
mod packed;
mod reader;
mod varint;

pub use embedded::{
    inflate, read_compressed_embedded, read_embedded, DEFAULT_MAX_DECOMPRESSED_SIZE,
};
pub use message::{Direction, Field, FieldRef, FieldValue, Matching, Message, WireTypeFilter};
pub use packed::{expand_field, PackedType};
pub use reader::{Tag, WireReader};
pub use varint::{decode_varint, zigzag, WireType, MAX_FIELD_NUMBER, MAX_VARINT_LEN};
