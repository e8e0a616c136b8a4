//! # pbfmap-core
//!
//! A streaming decoder for OpenStreetMap PBF files.
//!
//! The crate is split in two layers:
//!
//! - [`wire`]: a schema-less protobuf reader. Messages are decoded into
//!   ordered field records, packed fields are expanded on demand and
//!   embedded or zlib-compressed payloads are decoded recursively.
//! - [`osm`]: the PBF blob stream. Header and data blocks are decoded into
//!   a [`Map`] of nodes and ways, with string tables kept alive for tag
//!   lookups.
//!
//! Errors from both layers are reported through [`Error`].
//!
//! ## Example
//!
//! ```no_run
//! use pbfmap_core::read_map_file;
//!
//! let map = read_map_file("region.osm.pbf")?;
//! if let Some(way) = map.find_way(4_242) {
//!     for (key, value) in way.tags() {
//!         println!("{:?} = {:?}", key, value);
//!     }
//! }
//! # Ok::<(), pbfmap_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod osm;
pub mod wire;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use osm::{
    read_map, read_map_file, BoundingBox, DecodeState, DecoderConfig, Map, MapDecoder, Node,
    StringTableId, Way, WayRef,
};
pub use wire::{Field, FieldValue, Message, WireReader, WireType};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
