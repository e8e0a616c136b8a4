//! The decoded map: bounding box, nodes, ways and the string tables they
//! point into.
//!
//! String tables are owned by the [`Map`] in an arena; nodes and ways carry
//! a [`StringTableId`] handle instead of a reference, so the whole map is
//! one self-contained value.

use crate::wire::Message;
use std::borrow::Cow;

/// Nanodegrees per degree, the unit all coordinates are stored in
pub const NANODEGREES_PER_DEGREE: f64 = 1_000_000_000.0;

/// Converts a nanodegree coordinate to degrees
pub fn to_degrees(nanodegrees: i64) -> f64 {
    nanodegrees as f64 / NANODEGREES_PER_DEGREE
}

/// Bounding box from the file header, in nanodegrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    /// Western edge
    pub min_lon: i64,
    /// Eastern edge
    pub max_lon: i64,
    /// Northern edge
    pub max_lat: i64,
    /// Southern edge
    pub min_lat: i64,
}

/// Handle to a string table owned by a [`Map`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringTableId(usize);

impl StringTableId {
    /// Position of the table in the map's arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// The string table of one primitive block.
///
/// Entries are resolved by position: index `n` is the `n`-th field record
/// of the decoded table, whatever its field number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Message,
}

impl StringTable {
    /// Wraps a decoded `StringTable` message
    pub fn new(entries: Message) -> Self {
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw bytes of entry `index`, if it exists and is length-delimited
    pub fn get_bytes(&self, index: u64) -> Option<&[u8]> {
        let index = usize::try_from(index).ok()?;
        self.entries
            .get(index)?
            .value
            .as_bytes()
            .map(|b| b.as_ref())
    }

    /// Entry `index` as text; invalid UTF-8 is replaced lossily
    pub fn get(&self, index: u64) -> Option<Cow<'_, str>> {
        self.get_bytes(index).map(String::from_utf8_lossy)
    }
}

/// A node with absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    id: i64,
    lat: i64,
    lon: i64,
    string_table: StringTableId,
}

impl Node {
    pub(crate) fn new(id: i64, lat: i64, lon: i64, string_table: StringTableId) -> Self {
        Self {
            id,
            lat,
            lon,
            string_table,
        }
    }

    /// Node id
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Latitude in nanodegrees
    pub fn lat(&self) -> i64 {
        self.lat
    }

    /// Longitude in nanodegrees
    pub fn lon(&self) -> i64 {
        self.lon
    }

    /// Latitude in degrees
    pub fn lat_degrees(&self) -> f64 {
        to_degrees(self.lat)
    }

    /// Longitude in degrees
    pub fn lon_degrees(&self) -> f64 {
        to_degrees(self.lon)
    }

    /// String table of the block this node came from
    pub fn string_table(&self) -> StringTableId {
        self.string_table
    }
}

/// A way: an ordered list of node references plus tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    id: i64,
    keys: Vec<u64>,
    values: Vec<u64>,
    refs: Vec<i64>,
    string_table: StringTableId,
}

impl Way {
    pub(crate) fn new(
        id: i64,
        keys: Vec<u64>,
        values: Vec<u64>,
        refs: Vec<i64>,
        string_table: StringTableId,
    ) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            id,
            keys,
            values,
            refs,
            string_table,
        }
    }

    /// Way id
    pub fn id(&self) -> i64 {
        self.id
    }

    /// String-table indices of the tag keys
    pub fn key_indices(&self) -> &[u64] {
        &self.keys
    }

    /// String-table indices of the tag values
    pub fn value_indices(&self) -> &[u64] {
        &self.values
    }

    /// Absolute ids of the referenced nodes, in order
    pub fn refs(&self) -> &[i64] {
        &self.refs
    }

    /// String table of the block this way came from
    pub fn string_table(&self) -> StringTableId {
        self.string_table
    }
}

/// A way together with the string table its tags resolve against
#[derive(Debug, Clone, Copy)]
pub struct WayRef<'a> {
    way: &'a Way,
    strings: &'a StringTable,
}

impl<'a> WayRef<'a> {
    /// The underlying way
    pub fn way(&self) -> &'a Way {
        self.way
    }

    /// Way id
    pub fn id(&self) -> i64 {
        self.way.id
    }

    /// Number of node references
    pub fn ref_count(&self) -> usize {
        self.way.refs.len()
    }

    /// Node reference at `index`
    pub fn node_ref(&self, index: usize) -> Option<i64> {
        self.way.refs.get(index).copied()
    }

    /// Absolute ids of the referenced nodes
    pub fn refs(&self) -> &'a [i64] {
        &self.way.refs
    }

    /// Number of tags
    pub fn key_count(&self) -> usize {
        self.way.keys.len()
    }

    /// Key of tag `index`, or `None` if the tag or its string is missing
    pub fn key(&self, index: usize) -> Option<Cow<'a, str>> {
        let strings = self.strings;
        self.way.keys.get(index).and_then(|&i| strings.get(i))
    }

    /// Value of tag `index`, or `None` if the tag or its string is missing
    pub fn value(&self, index: usize) -> Option<Cow<'a, str>> {
        let strings = self.strings;
        self.way.values.get(index).and_then(|&i| strings.get(i))
    }

    /// Looks a tag up by key.
    ///
    /// The outer `None` means no tag has this key; `Some(None)` means the
    /// key exists but its value index does not resolve.
    pub fn value_of(&self, key: &str) -> Option<Option<Cow<'a, str>>> {
        let index = (0..self.key_count()).find(|&i| self.key(i).as_deref() == Some(key))?;
        Some(self.value(index))
    }

    /// Iterates over `(key, value)` pairs, unresolved strings as `None`
    pub fn tags(&self) -> impl Iterator<Item = (Option<Cow<'a, str>>, Option<Cow<'a, str>>)> + '_ {
        (0..self.key_count()).map(move |i| (self.key(i), self.value(i)))
    }
}

/// A fully decoded map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map {
    bbox: Option<BoundingBox>,
    nodes: Vec<Node>,
    ways: Vec<Way>,
    string_tables: Vec<StringTable>,
}

impl Map {
    /// Bounding box from the header, if the file declared one
    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    /// Number of decoded nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of decoded ways
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Node at `index`, in file order
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// All nodes in file order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Way at `index`, in file order
    pub fn way(&self, index: usize) -> Option<WayRef<'_>> {
        self.ways.get(index).and_then(|way| self.way_ref(way))
    }

    /// All ways in file order
    pub fn ways(&self) -> impl Iterator<Item = WayRef<'_>> + '_ {
        self.ways.iter().filter_map(|way| self.way_ref(way))
    }

    /// First node with the given id
    pub fn find_node(&self, id: i64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First way with the given id
    pub fn find_way(&self, id: i64) -> Option<WayRef<'_>> {
        self.ways().find(|w| w.id() == id)
    }

    /// String table behind a handle
    pub fn string_table(&self, id: StringTableId) -> Option<&StringTable> {
        self.string_tables.get(id.0)
    }

    /// Number of string tables (one per primitive block)
    pub fn string_table_count(&self) -> usize {
        self.string_tables.len()
    }

    fn way_ref<'a>(&'a self, way: &'a Way) -> Option<WayRef<'a>> {
        Some(WayRef {
            way,
            strings: self.string_table(way.string_table)?,
        })
    }

    pub(crate) fn set_bbox(&mut self, bbox: BoundingBox) {
        self.bbox = Some(bbox);
    }

    pub(crate) fn add_string_table(&mut self, table: StringTable) -> StringTableId {
        self.string_tables.push(table);
        StringTableId(self.string_tables.len() - 1)
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn push_way(&mut self, way: Way) {
        self.ways.push(way);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Field, FieldValue};
    use bytes::Bytes;

    fn table(entries: &[&'static str]) -> StringTable {
        StringTable::new(Message::from(
            entries
                .iter()
                .map(|s| Field::new(1, FieldValue::Bytes(Bytes::from_static(s.as_bytes()))))
                .collect::<Vec<_>>(),
        ))
    }

    fn sample_map() -> Map {
        let mut map = Map::default();
        let strings = map.add_string_table(table(&["", "highway", "residential", "name"]));
        map.push_node(Node::new(10, 515_000_000, -1_000_000, strings));
        map.push_node(Node::new(11, 515_100_000, -1_100_000, strings));
        map.push_way(Way::new(
            100,
            vec![1, 3],
            vec![2, 99],
            vec![10, 11],
            strings,
        ));
        map
    }

    #[test]
    fn test_string_table_lookup() {
        let strings = table(&["", "a", "b"]);
        assert_eq!(strings.len(), 3);
        assert_eq!(strings.get(1).as_deref(), Some("a"));
        assert_eq!(strings.get(0).as_deref(), Some(""));
        assert_eq!(strings.get(3), None);
        assert_eq!(strings.get(u64::MAX), None);
    }

    #[test]
    fn test_string_table_non_bytes_entry() {
        let strings = StringTable::new(Message::from(vec![Field::new(1, FieldValue::Varint(5))]));
        assert_eq!(strings.get_bytes(0), None);
    }

    #[test]
    fn test_way_tags() {
        let map = sample_map();
        let way = map.way(0).unwrap();
        assert_eq!(way.id(), 100);
        assert_eq!(way.key_count(), 2);
        assert_eq!(way.key(0).as_deref(), Some("highway"));
        assert_eq!(way.value(0).as_deref(), Some("residential"));
        assert_eq!(way.key(1).as_deref(), Some("name"));
        assert_eq!(way.value(1), None);
        assert_eq!(way.key(2), None);

        assert_eq!(
            way.value_of("highway"),
            Some(Some(Cow::Borrowed("residential")))
        );
        assert_eq!(way.value_of("name"), Some(None));
        assert_eq!(way.value_of("surface"), None);
        assert_eq!(way.tags().count(), 2);
    }

    #[test]
    fn test_way_refs() {
        let map = sample_map();
        let way = map.find_way(100).unwrap();
        assert_eq!(way.ref_count(), 2);
        assert_eq!(way.node_ref(1), Some(11));
        assert_eq!(way.node_ref(2), None);
        assert_eq!(way.refs(), &[10, 11]);
        assert!(map.find_way(101).is_none());
    }

    #[test]
    fn test_map_accessors() {
        let map = sample_map();
        assert_eq!(map.node_count(), 2);
        assert_eq!(map.way_count(), 1);
        assert!(map.bbox().is_none());
        assert_eq!(map.node(1).unwrap().id(), 11);
        assert!(map.node(2).is_none());
        assert!(map.way(1).is_none());
        assert_eq!(map.find_node(10).unwrap().lon(), -1_000_000);
        assert_eq!(map.string_table_count(), 1);

        let node = map.node(0).unwrap();
        assert!((node.lat_degrees() - 0.515).abs() < 1e-12);
        assert!(map.string_table(node.string_table()).is_some());
    }
}
