//! The blob stream decoder.
//!
//! An OSM PBF file is a sequence of `[u32 length][BlobHeader][Blob]`
//! frames. The first blob carries the `OSMHeader` block, every later blob
//! a `PrimitiveBlock`. [`MapDecoder`] walks the frames as a small state
//! machine and accumulates everything into one [`Map`].
//!
//! ## Example
//!
//! ```no_run
//! use pbfmap_core::{DecoderConfig, MapDecoder};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("region.osm.pbf")?);
//! let config = DecoderConfig::new().max_blob_size(64 * 1024 * 1024);
//! let map = MapDecoder::with_config(config).decode(file)?;
//! println!("{} nodes, {} ways", map.node_count(), map.way_count());
//! # Ok::<(), pbfmap_core::Error>(())
//! ```

use super::model::{BoundingBox, Map, StringTable};
use super::primitives::{decode_dense_nodes, decode_nodes, decode_ways, BlockContext, GroupKind};
use crate::error::{Error, Result};
use crate::wire::{
    inflate, read_embedded, Direction, Message, WireReader, WireType, WireTypeFilter,
    DEFAULT_MAX_DECOMPRESSED_SIZE,
};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};

// BlobHeader
const BLOB_HEADER_DATASIZE: u32 = 3;

// Blob
const BLOB_RAW_SIZE: u32 = 2;
const BLOB_ZLIB_DATA: u32 = 3;

// HeaderBlock / HeaderBBox
const HEADER_BBOX: u32 = 1;
const BBOX_MIN_LON: u32 = 1;
const BBOX_MAX_LON: u32 = 2;
const BBOX_MAX_LAT: u32 = 3;
const BBOX_MIN_LAT: u32 = 4;

// PrimitiveBlock
const BLOCK_STRINGTABLE: u32 = 1;
const BLOCK_GROUP: u32 = 2;
const BLOCK_GRANULARITY: u32 = 17;
const BLOCK_LAT_OFFSET: u32 = 19;
const BLOCK_LON_OFFSET: u32 = 20;

/// Granularity used when a block does not declare one
pub const DEFAULT_GRANULARITY: i64 = 100;

/// Size limits applied while decoding
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Largest accepted `BlobHeader`, in bytes
    pub max_blob_header_size: u32,
    /// Largest accepted `Blob`, in bytes
    pub max_blob_size: u64,
    /// Largest accepted inflated payload, in bytes
    pub max_decompressed_size: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_blob_header_size: 64 * 1024,
            max_blob_size: 32 * 1024 * 1024,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl DecoderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum `BlobHeader` size
    pub fn max_blob_header_size(mut self, size: u32) -> Self {
        self.max_blob_header_size = size;
        self
    }

    /// Sets the maximum `Blob` size
    pub fn max_blob_size(mut self, size: u64) -> Self {
        self.max_blob_size = size;
        self
    }

    /// Sets the maximum inflated payload size
    pub fn max_decompressed_size(mut self, size: u64) -> Self {
        self.max_decompressed_size = size;
        self
    }
}

/// Where the decoder is in the blob stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Waiting for the `OSMHeader` blob
    ExpectHeader,
    /// Header seen, reading `OSMData` blobs
    ExpectData,
    /// Input ended cleanly
    Done,
    /// Decoding stopped on an error
    Failed,
}

/// Decodes a PBF stream into a [`Map`]
#[derive(Debug, Clone)]
pub struct MapDecoder {
    config: DecoderConfig,
    state: DecodeState,
}

impl Default for MapDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDecoder {
    /// Creates a decoder with default limits
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Creates a decoder with custom limits
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            state: DecodeState::ExpectHeader,
        }
    }

    /// State after the last call to [`decode`](Self::decode)
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Decodes an entire stream.
    ///
    /// On failure nothing decoded so far is returned.
    pub fn decode<R: Read>(&mut self, input: R) -> Result<Map> {
        let mut reader = WireReader::new(input);
        let mut map = Map::default();
        self.state = DecodeState::ExpectHeader;

        match self.run(&mut reader, &mut map) {
            Ok(()) => {
                self.state = DecodeState::Done;
                debug!(
                    "Decoded {} nodes and {} ways from {} bytes",
                    map.node_count(),
                    map.way_count(),
                    reader.position()
                );
                Ok(map)
            }
            Err(e) => {
                self.state = DecodeState::Failed;
                debug!(
                    "Decode failed at offset {} (truncated: {}): {}",
                    reader.position(),
                    e.is_truncation(),
                    e
                );
                Err(e)
            }
        }
    }

    fn run<R: Read>(&mut self, reader: &mut WireReader<R>, map: &mut Map) -> Result<()> {
        let mut blobs = 0usize;

        while let Some(blob) = self.next_blob(reader)? {
            trace!("Blob {} ends at offset {}", blobs, reader.position());
            blobs += 1;

            match self.state {
                DecodeState::ExpectHeader => {
                    self.decode_header(&blob, map)?;
                    self.state = DecodeState::ExpectData;
                }
                DecodeState::ExpectData => self.decode_data(&blob, map)?,
                DecodeState::Done | DecodeState::Failed => break,
            }
        }

        debug!("Reached end of input after {} blobs", blobs);
        Ok(())
    }

    /// Reads the next `BlobHeader`/`Blob` frame, `None` at a clean end of input.
    fn next_blob<R: Read>(&self, reader: &mut WireReader<R>) -> Result<Option<Message>> {
        let Some(header_len) = reader.read_length_prefix()? else {
            return Ok(None);
        };

        if header_len > self.config.max_blob_header_size {
            return Err(Error::LimitExceeded {
                what: "blob header",
                size: header_len.into(),
                limit: self.config.max_blob_header_size.into(),
            });
        }

        let header = read_sized(reader, header_len.into(), "blob header")?;
        let datasize = header
            .find_last(BLOB_HEADER_DATASIZE, WireType::Varint)
            .and_then(|f| f.value.as_varint())
            .ok_or_else(|| Error::missing_field("BlobHeader", BLOB_HEADER_DATASIZE))?;

        if datasize > self.config.max_blob_size {
            return Err(Error::LimitExceeded {
                what: "blob",
                size: datasize,
                limit: self.config.max_blob_size,
            });
        }

        trace!("Blob header of {} bytes announces {} bytes", header_len, datasize);
        read_sized(reader, datasize, "blob").map(Some)
    }

    fn inflate_blob(&self, blob: &Message) -> Result<Message> {
        let payload = blob
            .find_last(BLOB_ZLIB_DATA, WireType::Len)
            .and_then(|f| f.value.as_bytes())
            .ok_or_else(|| Error::structural("blob carries no zlib_data payload"))?;

        let raw_size = blob
            .find_last(BLOB_RAW_SIZE, WireType::Varint)
            .and_then(|f| f.value.as_varint())
            .unwrap_or(0);
        let hint = usize::try_from(raw_size).unwrap_or(0);

        let data = inflate(payload, hint, self.config.max_decompressed_size)?;
        read_embedded(&data)
    }

    fn decode_header(&self, blob: &Message, map: &mut Map) -> Result<()> {
        let header = self.inflate_blob(blob)?;

        match header
            .find_last(HEADER_BBOX, WireType::Len)
            .and_then(|f| f.value.as_bytes())
        {
            Some(payload) => {
                let bbox = decode_bbox(payload)?;
                debug!("Header bounding box: {:?}", bbox);
                map.set_bbox(bbox);
            }
            None => debug!("Header has no bounding box"),
        }

        Ok(())
    }

    fn decode_data(&self, blob: &Message, map: &mut Map) -> Result<()> {
        let block = self.inflate_blob(blob)?;
        self.decode_block(&block, map)
    }

    fn decode_block(&self, block: &Message, map: &mut Map) -> Result<()> {
        let strings = block
            .find_last(BLOCK_STRINGTABLE, WireType::Len)
            .and_then(|f| f.value.as_bytes())
            .ok_or_else(|| Error::missing_field("PrimitiveBlock", BLOCK_STRINGTABLE))?;
        let strings = StringTable::new(read_embedded(strings)?);

        let ctx = BlockContext {
            granularity: block_param(block, BLOCK_GRANULARITY, DEFAULT_GRANULARITY),
            lat_offset: block_param(block, BLOCK_LAT_OFFSET, 0),
            lon_offset: block_param(block, BLOCK_LON_OFFSET, 0),
            string_table: map.add_string_table(strings),
        };
        trace!(
            "Primitive block: granularity {}, lat_offset {}, lon_offset {}",
            ctx.granularity,
            ctx.lat_offset,
            ctx.lon_offset
        );

        let mut next = block.find_first(BLOCK_GROUP, WireTypeFilter::Any);
        while let Some(field) = next {
            let payload = field
                .value
                .as_bytes()
                .ok_or_else(|| Error::structural("primitive group is not length-delimited"))?;
            let group = read_embedded(payload)?;

            let kind = GroupKind::classify(&group)?;
            let added = match kind {
                GroupKind::Nodes => decode_nodes(map, &group, &ctx)?,
                GroupKind::DenseNodes => decode_dense_nodes(map, &group, &ctx)?,
                GroupKind::Ways => decode_ways(map, &group, &ctx)?,
                GroupKind::Relations | GroupKind::ChangeSets => {
                    trace!("Skipping group of kind {:?}", kind);
                    0
                }
            };
            trace!(
                "Group field {} ({:?}) added {} entities",
                kind.field_number(),
                kind,
                added
            );

            next = field.next_match(BLOCK_GROUP, WireTypeFilter::Any, Direction::Forward);
        }

        Ok(())
    }
}

/// Reads a message of exactly `size` bytes; a zero size is an empty message.
fn read_sized<R: Read>(
    reader: &mut WireReader<R>,
    size: u64,
    context: &'static str,
) -> Result<Message> {
    match reader.read_message(size)? {
        Some(message) => Ok(message),
        None if size == 0 => Ok(Message::new()),
        None => Err(Error::truncated(reader.position(), context)),
    }
}

/// Reads a singular numeric block parameter, last occurrence wins.
fn block_param(block: &Message, number: u32, default: i64) -> i64 {
    block
        .find_last(number, WireTypeFilter::Any)
        .and_then(|f| f.value.as_i64())
        .unwrap_or(default)
}

/// Decodes a `HeaderBBox` message.
pub fn decode_bbox(payload: &[u8]) -> Result<BoundingBox> {
    let message = read_embedded(payload)?;
    let coord = |number| {
        message
            .find_last(number, WireType::Varint)
            .and_then(|f| f.value.as_sint64())
            .ok_or_else(|| Error::missing_field("HeaderBBox", number))
    };

    Ok(BoundingBox {
        min_lon: coord(BBOX_MIN_LON)?,
        max_lon: coord(BBOX_MAX_LON)?,
        max_lat: coord(BBOX_MAX_LAT)?,
        min_lat: coord(BBOX_MIN_LAT)?,
    })
}

/// Decodes a whole PBF stream with default limits.
pub fn read_map<R: Read>(input: R) -> Result<Map> {
    MapDecoder::new().decode(input)
}

/// Opens and decodes a PBF file with default limits.
pub fn read_map_file(path: impl AsRef<Path>) -> Result<Map> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
    read_map(BufReader::new(file))
}
