//! Decoders for the contents of a `PrimitiveGroup`.
//!
//! Each decoder appends entities to the [`Map`] in encounter order and
//! returns how many it added.

use super::model::{Map, Node, StringTableId, Way};
use crate::error::{Error, Result};
use crate::wire::{read_embedded, zigzag, Message, PackedType, WireType, WireTypeFilter};
use tracing::trace;

// PrimitiveGroup
const GROUP_NODES: u32 = 1;
const GROUP_DENSE: u32 = 2;
const GROUP_WAYS: u32 = 3;
const GROUP_RELATIONS: u32 = 4;
const GROUP_CHANGESETS: u32 = 5;

// Node and DenseNodes
const NODE_ID: u32 = 1;
const NODE_LAT: u32 = 8;
const NODE_LON: u32 = 9;

// Way
const WAY_ID: u32 = 1;
const WAY_KEYS: u32 = 2;
const WAY_VALUES: u32 = 3;
const WAY_REFS: u32 = 8;

/// What a `PrimitiveGroup` contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Plain nodes
    Nodes,
    /// One dense node block
    DenseNodes,
    /// Ways
    Ways,
    /// Relations (skipped)
    Relations,
    /// Changesets (skipped)
    ChangeSets,
}

impl GroupKind {
    /// Classifies a group by the number of its first field.
    pub fn classify(group: &Message) -> Result<Self> {
        let first = group
            .get(0)
            .ok_or_else(|| Error::structural("primitive group is empty"))?;

        match first.number {
            GROUP_NODES => Ok(GroupKind::Nodes),
            GROUP_DENSE => Ok(GroupKind::DenseNodes),
            GROUP_WAYS => Ok(GroupKind::Ways),
            GROUP_RELATIONS => Ok(GroupKind::Relations),
            GROUP_CHANGESETS => Ok(GroupKind::ChangeSets),
            other => Err(Error::structural(format!(
                "unknown primitive group field {}",
                other
            ))),
        }
    }

    /// Field number of this kind inside a `PrimitiveGroup`
    pub fn field_number(self) -> u32 {
        match self {
            GroupKind::Nodes => GROUP_NODES,
            GroupKind::DenseNodes => GROUP_DENSE,
            GroupKind::Ways => GROUP_WAYS,
            GroupKind::Relations => GROUP_RELATIONS,
            GroupKind::ChangeSets => GROUP_CHANGESETS,
        }
    }
}

/// Per-block parameters shared by every group of a `PrimitiveBlock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// Coordinate unit in nanodegrees
    pub granularity: i64,
    /// Added to every latitude, in nanodegrees
    pub lat_offset: i64,
    /// Added to every longitude, in nanodegrees
    pub lon_offset: i64,
    /// The block's string table
    pub string_table: StringTableId,
}

impl BlockContext {
    /// Converts a raw latitude into nanodegrees
    pub fn lat(&self, raw: i64) -> i64 {
        self.lat_offset
            .wrapping_add(self.granularity.wrapping_mul(raw))
    }

    /// Converts a raw longitude into nanodegrees
    pub fn lon(&self, raw: i64) -> i64 {
        self.lon_offset
            .wrapping_add(self.granularity.wrapping_mul(raw))
    }
}

fn required_sint64(message: &Message, name: &str, number: u32) -> Result<i64> {
    message
        .find_last(number, WireType::Varint)
        .and_then(|f| f.value.as_sint64())
        .ok_or_else(|| Error::missing_field(name, number))
}

fn varints(message: &Message, number: u32) -> Vec<u64> {
    message
        .matching(number, WireType::Varint)
        .filter_map(|f| f.value.as_varint())
        .collect()
}

/// Embedded messages of one kind inside a group, decoded in order.
///
/// Every record with this field number must be length-delimited.
fn elements(group: &Message, number: u32) -> impl Iterator<Item = Result<Message>> + '_ {
    group
        .matching(number, WireTypeFilter::Any)
        .map(move |field| match field.value.as_bytes() {
            Some(payload) => read_embedded(payload),
            None => Err(Error::structural(format!(
                "primitive group field {} has wire type {:?}, expected length-delimited",
                number,
                field.wire_type()
            ))),
        })
}

/// Decodes a group of plain `Node` messages.
pub fn decode_nodes(map: &mut Map, group: &Message, ctx: &BlockContext) -> Result<usize> {
    let mut count = 0;

    for element in elements(group, GROUP_NODES) {
        let node = element?;
        let id = required_sint64(&node, "Node", NODE_ID)?;
        let lat = required_sint64(&node, "Node", NODE_LAT)?;
        let lon = required_sint64(&node, "Node", NODE_LON)?;

        map.push_node(Node::new(id, ctx.lat(lat), ctx.lon(lon), ctx.string_table));
        count += 1;
    }

    Ok(count)
}

/// Decodes a `DenseNodes` group: delta-coded parallel id/lat/lon arrays.
pub fn decode_dense_nodes(map: &mut Map, group: &Message, ctx: &BlockContext) -> Result<usize> {
    let mut count = 0;

    for element in elements(group, GROUP_DENSE) {
        let mut dense = element?;
        dense.expand_packed(NODE_ID, PackedType::Varint)?;
        dense.expand_packed(NODE_LAT, PackedType::Varint)?;
        dense.expand_packed(NODE_LON, PackedType::Varint)?;

        let ids = varints(&dense, NODE_ID);
        let lats = varints(&dense, NODE_LAT);
        let lons = varints(&dense, NODE_LON);

        if ids.len() != lats.len() || ids.len() != lons.len() {
            return Err(Error::structural(format!(
                "DenseNodes has {} ids, {} latitudes and {} longitudes",
                ids.len(),
                lats.len(),
                lons.len()
            )));
        }

        let (mut id, mut lat, mut lon) = (0i64, 0i64, 0i64);
        for ((&d_id, &d_lat), &d_lon) in ids.iter().zip(&lats).zip(&lons) {
            id = id.wrapping_add(zigzag(d_id));
            lat = lat.wrapping_add(zigzag(d_lat));
            lon = lon.wrapping_add(zigzag(d_lon));

            map.push_node(Node::new(id, ctx.lat(lat), ctx.lon(lon), ctx.string_table));
        }

        trace!("Decoded {} dense nodes", ids.len());
        count += ids.len();
    }

    Ok(count)
}

/// Decodes a group of `Way` messages.
///
/// Tag indices are stored unresolved; node references are delta-decoded
/// into absolute ids.
pub fn decode_ways(map: &mut Map, group: &Message, ctx: &BlockContext) -> Result<usize> {
    let mut count = 0;

    for element in elements(group, GROUP_WAYS) {
        let mut way = element?;
        let id = way
            .find_last(WAY_ID, WireType::Varint)
            .and_then(|f| f.value.as_i64())
            .ok_or_else(|| Error::missing_field("Way", WAY_ID))?;

        way.expand_packed(WAY_KEYS, PackedType::Varint)?;
        way.expand_packed(WAY_VALUES, PackedType::Varint)?;
        way.expand_packed(WAY_REFS, PackedType::Varint)?;

        let keys = varints(&way, WAY_KEYS);
        let values = varints(&way, WAY_VALUES);
        if keys.len() != values.len() {
            return Err(Error::structural(format!(
                "way {} has {} keys but {} values",
                id,
                keys.len(),
                values.len()
            )));
        }

        let refs = varints(&way, WAY_REFS)
            .into_iter()
            .scan(0i64, |total, delta| {
                *total = total.wrapping_add(zigzag(delta));
                Some(*total)
            })
            .collect();

        map.push_way(Way::new(id, keys, values, refs, ctx.string_table));
        count += 1;
    }

    Ok(count)
}
