//! OpenStreetMap PBF decoding on top of the [`wire`](crate::wire) layer.
//!
//! - [`decoder`]: the blob stream state machine
//! - [`primitives`]: node, dense node and way groups
//! - [`model`]: the decoded [`Map`] and its accessors

pub mod decoder;
pub mod model;
pub mod primitives;

pub use decoder::{
    decode_bbox, read_map, read_map_file, DecodeState, DecoderConfig, MapDecoder,
    DEFAULT_GRANULARITY,
};
pub use model::{
    to_degrees, BoundingBox, Map, Node, StringTable, StringTableId, Way, WayRef,
    NANODEGREES_PER_DEGREE,
};
pub use primitives::{BlockContext, GroupKind};
