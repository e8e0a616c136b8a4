//! Error types for the pbfmap-core library.
//!
//! Every failure aborts the decode call that produced it. The variants
//! carry enough context (byte offsets, field numbers, sizes) to produce a
//! useful message for the user without a debugger.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pbfmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all decoding operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input ended in the middle of a field, length prefix or blob
    #[error("truncated input at offset {offset}: {context}")]
    TruncatedInput {
        /// Byte offset where the input ran out
        offset: u64,
        /// What was being read when the input ended
        context: &'static str,
    },

    /// A varint ran for 10 bytes without a terminating byte
    #[error("malformed varint at offset {offset}: no terminating byte within 10 bytes")]
    MalformedVarint {
        /// Byte offset of the first byte of the varint
        offset: u64,
    },

    /// A tag carried a wire type outside of 0..=5
    #[error("invalid wire type {value} at offset {offset}")]
    InvalidWireType {
        /// Byte offset of the tag
        offset: u64,
        /// The raw wire type bits
        value: u8,
    },

    /// A tag carried a field number outside of the valid protobuf range
    #[error("invalid field number {number} at offset {offset}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// Byte offset of the tag
        offset: u64,
        /// The decoded field number
        number: u64,
        /// Maximum valid field number
        max: u32,
    },

    /// Decoded data does not have the shape an OSM structure requires
    #[error("structural mismatch: {details}")]
    StructuralMismatch {
        /// Description of the mismatch
        details: String,
    },

    /// A packed repeated field could not be expanded
    #[error("cannot expand packed field {field}: {details}")]
    PackedField {
        /// Field number of the packed field
        field: u32,
        /// Description of the problem
        details: String,
    },

    /// A zlib payload could not be inflated
    #[error("failed to decompress blob payload: {0}")]
    DecompressionFailure(#[source] std::io::Error),

    /// A message did not end exactly on its byte budget
    #[error("message overran its byte budget: consumed {consumed} of {budget} bytes")]
    BudgetViolation {
        /// Declared size of the message
        budget: u64,
        /// Bytes consumed when the overrun was detected
        consumed: u64,
    },

    /// A declared or decompressed size exceeded the configured limit
    #[error("{what} of {size} bytes exceeds the limit of {limit} bytes")]
    LimitExceeded {
        /// The kind of object that was too large
        what: &'static str,
        /// The offending size
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Underlying reader failed for a reason other than end of input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a new truncated input error
    pub fn truncated(offset: u64, context: &'static str) -> Self {
        Self::TruncatedInput { offset, context }
    }

    /// Creates a new malformed varint error
    pub fn malformed_varint(offset: u64) -> Self {
        Self::MalformedVarint { offset }
    }

    /// Creates a new structural mismatch error
    pub fn structural(details: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            details: details.into(),
        }
    }

    /// Creates a new missing required field error
    pub fn missing_field(message: &str, field: u32) -> Self {
        Self::structural(format!("{} is missing required field {}", message, field))
    }

    /// Creates a new packed field error
    pub fn packed(field: u32, details: impl Into<String>) -> Self {
        Self::PackedField {
            field,
            details: details.into(),
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the input ended before the data was complete
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedInput { .. })
    }
}
