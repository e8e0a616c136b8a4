//! Map queries and their text output.

use pbfmap_core::osm::to_degrees;
use pbfmap_core::Map;
use std::io::{self, Write};

/// One query against a decoded map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Node and way totals
    Summary,
    /// Header bounding box in degrees
    BoundingBox,
    /// Coordinates of one node
    Node(i64),
    /// Node references of a way, or selected tags when `keys` is non-empty
    Way {
        /// Way id
        id: i64,
        /// Tag keys to look up
        keys: Vec<String>,
    },
}

/// Truncates (not rounds) to 5 decimal places
fn truncate(value: f64) -> f64 {
    (value * 100_000.0).trunc() / 100_000.0
}

fn degrees(nanodegrees: i64) -> f64 {
    truncate(to_degrees(nanodegrees))
}

/// Runs `queries` in order, each followed by a blank line.
pub fn run(map: &Map, source: &str, queries: &[Query], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== OSM Map Query Results ===")?;
    writeln!(out, "Processing file: {}", source)?;
    writeln!(out)?;

    for query in queries {
        match query {
            Query::Summary => summary(map, out)?,
            Query::BoundingBox => bounding_box(map, out)?,
            Query::Node(id) => node(map, *id, out)?,
            Query::Way { id, keys } if keys.is_empty() => way_refs(map, *id, out)?,
            Query::Way { id, keys } => way_tags(map, *id, keys, out)?,
        }
        writeln!(out)?;
    }

    Ok(())
}

fn summary(map: &Map, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== Map Summary ===")?;
    writeln!(out, "Total Nodes: {}", map.node_count())?;
    writeln!(out, "Total Ways: {}", map.way_count())
}

fn bounding_box(map: &Map, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== Map Bounding Box ===")?;

    let Some(bbox) = map.bbox() else {
        return writeln!(out, "No bounding box in the map header.");
    };

    writeln!(out, "Bounding Box Coordinates:")?;
    writeln!(out, "  Minimum Longitude: {:.9}", degrees(bbox.min_lon))?;
    writeln!(out, "  Maximum Longitude: {:.9}", degrees(bbox.max_lon))?;
    writeln!(out, "  Minimum Latitude:  {:.9}", degrees(bbox.min_lat))?;
    writeln!(out, "  Maximum Latitude:  {:.9}", degrees(bbox.max_lat))
}

fn node(map: &Map, id: i64, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== Node Information ===")?;
    writeln!(out, "Searching for Node ID: {}", id)?;

    match map.find_node(id) {
        Some(node) => {
            writeln!(out, "Node Found:")?;
            writeln!(out, "  ID: {}", node.id())?;
            writeln!(out, "  Latitude:  {:.9}", degrees(node.lat()))?;
            writeln!(out, "  Longitude: {:.9}", degrees(node.lon()))
        }
        None => writeln!(out, "Node not found in the map."),
    }
}

fn way_refs(map: &Map, id: i64, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "=== Way Node References ===")?;
    writeln!(out, "Searching for Way ID: {}", id)?;

    let Some(way) = map.find_way(id) else {
        return writeln!(out, "Way not found in the map.");
    };

    let refs: Vec<String> = way.refs().iter().map(i64::to_string).collect();
    writeln!(out, "Way Found:")?;
    writeln!(out, "  ID: {}", way.id())?;
    writeln!(out, "  Number of Node References: {}", way.ref_count())?;
    writeln!(out, "  Node Reference Sequence: {}", refs.join(" "))
}

fn way_tags(map: &Map, id: i64, keys: &[String], out: &mut impl Write) -> io::Result<()> {
    let Some(way) = map.find_way(id) else {
        return writeln!(out, "Way ID {} not found in the map.", id);
    };

    writeln!(out, "=== Way Key-Value Pairs ===")?;
    writeln!(out, "Way ID: {}", id)?;
    writeln!(out, "Requested Key-Value Pairs:")?;

    for key in keys {
        match way.value_of(key) {
            Some(Some(value)) => writeln!(out, "  {}: {}", key, value)?,
            Some(None) => writeln!(out, "  {}: <no value>", key)?,
            None => writeln!(out, "  {}: <key not found>", key)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use pretty_assertions::assert_eq;

    fn render(map: &Map, queries: &[Query]) -> String {
        let mut out = Vec::new();
        run(map, "fixture.osm.pbf", queries, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate(1.234567), 1.23456);
        assert_eq!(truncate(-1.234567), -1.23456);
        assert_eq!(truncate(2.5), 2.5);
    }

    #[test]
    fn test_full_report() {
        let map = pbfmap_core::read_map(&fixture::query_stream(true)[..]).unwrap();
        let queries = vec![
            Query::Summary,
            Query::BoundingBox,
            Query::Node(100),
            Query::Node(7),
            Query::Way {
                id: 500,
                keys: vec![],
            },
            Query::Way {
                id: 500,
                keys: vec!["highway".into(), "name".into(), "surface".into()],
            },
            Query::Way {
                id: 9,
                keys: vec!["x".into()],
            },
        ];

        let expected = "\
=== OSM Map Query Results ===
Processing file: fixture.osm.pbf

=== Map Summary ===
Total Nodes: 2
Total Ways: 1

=== Map Bounding Box ===
Bounding Box Coordinates:
  Minimum Longitude: -122.500000000
  Maximum Longitude: -122.250000000
  Minimum Latitude:  37.500000000
  Maximum Latitude:  37.750000000

=== Node Information ===
Searching for Node ID: 100
Node Found:
  ID: 100
  Latitude:  1.234560000
  Longitude: 2.500000000

=== Node Information ===
Searching for Node ID: 7
Node not found in the map.

=== Way Node References ===
Searching for Way ID: 500
Way Found:
  ID: 500
  Number of Node References: 2
  Node Reference Sequence: 100 101

=== Way Key-Value Pairs ===
Way ID: 500
Requested Key-Value Pairs:
  highway: residential
  name: <no value>
  surface: <key not found>

Way ID 9 not found in the map.

";
        assert_eq!(render(&map, &queries), expected);
    }

    #[test]
    fn test_missing_bbox_and_way() {
        let map = pbfmap_core::read_map(&fixture::query_stream(false)[..]).unwrap();
        let output = render(
            &map,
            &[
                Query::BoundingBox,
                Query::Way {
                    id: 42,
                    keys: vec![],
                },
            ],
        );

        assert!(output.contains("No bounding box in the map header.\n"));
        assert!(output.contains("Searching for Way ID: 42\nWay not found in the map.\n"));
    }
}
