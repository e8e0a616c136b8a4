//! OSM PBF fixtures encoded with prost.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use prost::Message;
use std::io::Write;

#[derive(Clone, PartialEq, prost::Message)]
pub struct BlobHeader {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(int32, optional, tag = "3")]
    pub datasize: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Blob {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub raw: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "2")]
    pub raw_size: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub zlib_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HeaderBlock {
    #[prost(message, optional, tag = "1")]
    pub bbox: Option<HeaderBBox>,
    #[prost(string, repeated, tag = "4")]
    pub required_features: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HeaderBBox {
    #[prost(sint64, optional, tag = "1")]
    pub left: Option<i64>,
    #[prost(sint64, optional, tag = "2")]
    pub right: Option<i64>,
    #[prost(sint64, optional, tag = "3")]
    pub top: Option<i64>,
    #[prost(sint64, optional, tag = "4")]
    pub bottom: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimitiveBlock {
    #[prost(message, optional, tag = "1")]
    pub stringtable: Option<StringTable>,
    #[prost(message, repeated, tag = "2")]
    pub primitivegroup: Vec<PrimitiveGroup>,
    #[prost(int32, optional, tag = "17")]
    pub granularity: Option<i32>,
    #[prost(int64, optional, tag = "19")]
    pub lat_offset: Option<i64>,
    #[prost(int64, optional, tag = "20")]
    pub lon_offset: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StringTable {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub s: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimitiveGroup {
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<Node>,
    #[prost(message, optional, tag = "2")]
    pub dense: Option<DenseNodes>,
    #[prost(message, repeated, tag = "3")]
    pub ways: Vec<Way>,
    #[prost(message, repeated, tag = "4")]
    pub relations: Vec<Relation>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Node {
    #[prost(sint64, optional, tag = "1")]
    pub id: Option<i64>,
    #[prost(uint32, repeated, tag = "2")]
    pub keys: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub vals: Vec<u32>,
    #[prost(sint64, optional, tag = "8")]
    pub lat: Option<i64>,
    #[prost(sint64, optional, tag = "9")]
    pub lon: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DenseNodes {
    #[prost(sint64, repeated, tag = "1")]
    pub id: Vec<i64>,
    #[prost(sint64, repeated, tag = "8")]
    pub lat: Vec<i64>,
    #[prost(sint64, repeated, tag = "9")]
    pub lon: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Way {
    #[prost(int64, optional, tag = "1")]
    pub id: Option<i64>,
    #[prost(uint32, repeated, tag = "2")]
    pub keys: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub vals: Vec<u32>,
    #[prost(sint64, repeated, tag = "8")]
    pub refs: Vec<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Relation {
    #[prost(int64, optional, tag = "1")]
    pub id: Option<i64>,
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Frames an already-encoded blob: length prefix, `BlobHeader`, blob bytes.
pub fn frame_blob(kind: &str, blob: &[u8]) -> Vec<u8> {
    let header = BlobHeader {
        r#type: kind.to_string(),
        datasize: Some(blob.len() as i32),
    }
    .encode_to_vec();

    let mut out = (header.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&header);
    out.extend_from_slice(blob);
    out
}

/// Compresses `block` into a zlib blob and frames it.
pub fn frame(kind: &str, block: &impl Message) -> Vec<u8> {
    let raw = block.encode_to_vec();
    let blob = Blob {
        raw: None,
        raw_size: Some(raw.len() as i32),
        zlib_data: Some(zlib(&raw)),
    }
    .encode_to_vec();
    frame_blob(kind, &blob)
}

pub fn header_frame(bbox: Option<HeaderBBox>) -> Vec<u8> {
    frame(
        "OSMHeader",
        &HeaderBlock {
            bbox,
            required_features: vec!["OsmSchema-V0.6".into(), "DenseNodes".into()],
        },
    )
}

pub fn data_frame(block: &PrimitiveBlock) -> Vec<u8> {
    frame("OSMData", block)
}

pub fn strings(entries: &[&str]) -> StringTable {
    StringTable {
        s: entries.iter().map(|s| s.as_bytes().to_vec()).collect(),
    }
}

/// Delta-codes a list of absolute values.
pub fn delta(values: &[i64]) -> Vec<i64> {
    let mut last = 0;
    values
        .iter()
        .map(|&v| {
            let d = v - last;
            last = v;
            d
        })
        .collect()
}

pub fn dense_group(ids: &[i64], lats: &[i64], lons: &[i64]) -> PrimitiveGroup {
    PrimitiveGroup {
        dense: Some(DenseNodes {
            id: delta(ids),
            lat: delta(lats),
            lon: delta(lons),
        }),
        ..Default::default()
    }
}

pub fn way_group(ways: Vec<Way>) -> PrimitiveGroup {
    PrimitiveGroup {
        ways,
        ..Default::default()
    }
}

pub fn way(id: i64, keys: &[u32], vals: &[u32], refs: &[i64]) -> Way {
    Way {
        id: Some(id),
        keys: keys.to_vec(),
        vals: vals.to_vec(),
        refs: delta(refs),
    }
}

/// Bounding box of the sample stream, in nanodegrees
pub fn sample_bbox() -> HeaderBBox {
    HeaderBBox {
        left: Some(-122_500_000_000),
        right: Some(-122_300_000_000),
        top: Some(37_900_000_000),
        bottom: Some(37_700_000_000),
    }
}

/// A header with a bounding box and one data block holding three dense
/// nodes and one tagged way over them.
pub fn sample_stream() -> Vec<u8> {
    let block = PrimitiveBlock {
        stringtable: Some(strings(&[
            "",
            "highway",
            "residential",
            "name",
            "Main Street",
        ])),
        primitivegroup: vec![
            dense_group(
                &[100, 101, 102],
                &[377_749_000, 377_750_000, 377_751_000],
                &[-1_224_194_000, -1_224_195_000, -1_224_196_000],
            ),
            way_group(vec![way(500, &[1, 3], &[2, 4], &[100, 101, 102])]),
        ],
        granularity: None,
        lat_offset: None,
        lon_offset: None,
    };

    let mut stream = header_frame(Some(sample_bbox()));
    stream.extend(data_frame(&block));
    stream
}

/// Two dense nodes (100 and 101) and way 500 over them, on coordinates that
/// stay exact after truncation to 5 decimals.
///
/// Way 500 is tagged `highway=residential` and carries a `name` key whose
/// value index is outside the string table.
pub fn query_stream(with_bbox: bool) -> Vec<u8> {
    let bbox = with_bbox.then_some(HeaderBBox {
        left: Some(-122_500_000_000),
        right: Some(-122_250_000_000),
        top: Some(37_750_000_000),
        bottom: Some(37_500_000_000),
    });

    let block = PrimitiveBlock {
        stringtable: Some(strings(&["", "highway", "residential", "name"])),
        primitivegroup: vec![
            dense_group(
                &[100, 101],
                &[12_345_670, 375_000_000],
                &[25_000_000, -1_222_500_000],
            ),
            way_group(vec![way(500, &[1, 3], &[2, 9], &[100, 101])]),
        ],
        ..Default::default()
    };

    let mut stream = header_frame(bbox);
    stream.extend(data_frame(&block));
    stream
}
