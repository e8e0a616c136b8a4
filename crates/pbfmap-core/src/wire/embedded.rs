//! Embedded and zlib-compressed sub-messages.

use super::message::Message;
use super::reader::WireReader;
use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Default ceiling for a single inflated payload (32 MiB)
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: u64 = 32 * 1024 * 1024;

/// Decodes a byte buffer as one complete message.
///
/// An empty buffer is a valid, empty message.
pub fn read_embedded(buf: &[u8]) -> Result<Message> {
    let mut reader = WireReader::new(buf);
    let message = reader.read_message(buf.len() as u64)?.unwrap_or_default();
    Ok(message)
}

/// Inflates a zlib buffer and decodes the result as one complete message.
pub fn read_compressed_embedded(buf: &[u8]) -> Result<Message> {
    let data = inflate(buf, 0, DEFAULT_MAX_DECOMPRESSED_SIZE)?;
    read_embedded(&data)
}

/// Inflates a zlib buffer, refusing output larger than `limit` bytes.
///
/// `size_hint` pre-sizes the output buffer and may be zero.
pub fn inflate(buf: &[u8], size_hint: usize, limit: u64) -> Result<Vec<u8>> {
    let capacity = size_hint.min(usize::try_from(limit).unwrap_or(usize::MAX));
    let mut out = Vec::with_capacity(capacity);

    ZlibDecoder::new(buf)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(Error::DecompressionFailure)?;

    if out.len() as u64 > limit {
        return Err(Error::LimitExceeded {
            what: "decompressed payload",
            size: out.len() as u64,
            limit,
        });
    }
    Ok(out)
}
