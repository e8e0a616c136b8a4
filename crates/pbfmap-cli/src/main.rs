//! pbfmap - Query nodes, ways and bounds of an OpenStreetMap PBF file
//!
//! The whole file is decoded into memory first; queries then run in the
//! order they were given on the command line.

mod query;

#[cfg(test)]
#[path = "../../pbfmap-core/tests/common/mod.rs"]
mod fixture;

use anyhow::{bail, Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use pbfmap_core::{DecoderConfig, Map, MapDecoder};
use query::Query;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Query nodes, ways and bounds of an OpenStreetMap PBF file
#[derive(clap::Parser, Debug)]
#[command(name = "pbfmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PBF file to read (standard input if omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print node and way totals
    #[arg(short, long)]
    summary: bool,

    /// Print the header bounding box
    #[arg(short, long)]
    bbox: bool,

    /// Print the coordinates of a node (repeatable)
    #[arg(short, long = "node", value_name = "ID", allow_negative_numbers = true)]
    nodes: Vec<i64>,

    /// Print the node references of a way, or the values of the given keys
    #[arg(
        short,
        long = "way",
        value_names = ["ID", "KEY"],
        num_args = 1..,
        action = clap::ArgAction::Append,
        allow_negative_numbers = true
    )]
    ways: Vec<String>,

    /// Maximum size of a single decompressed block, in bytes
    #[arg(long, value_name = "BYTES", env = "PBFMAP_MAX_BLOCK_SIZE")]
    max_block_size: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        let config = DecoderConfig::new();
        match self.max_block_size {
            Some(size) => config.max_blob_size(size).max_decompressed_size(size),
            None => config,
        }
    }
}

/// Parses arguments into the options and the matches queries are built from
fn parse_from<I, T>(args: I) -> std::result::Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    Ok((cli, matches))
}

/// Queries in command-line order.
///
/// Values come from `cli`; `matches` supplies their positions and splits
/// the `-w` values into one group per occurrence: the way id, then keys.
fn queries(cli: &Cli, matches: &ArgMatches) -> Result<Vec<Query>> {
    let mut indexed: Vec<(usize, Query)> = Vec::new();
    let position = |id: &str| matches.index_of(id).unwrap_or(usize::MAX);

    if cli.summary {
        indexed.push((position("summary"), Query::Summary));
    }
    if cli.bbox {
        indexed.push((position("bbox"), Query::BoundingBox));
    }

    let node_indices = matches.indices_of("nodes").into_iter().flatten();
    indexed.extend(
        node_indices
            .zip(&cli.nodes)
            .map(|(index, &id)| (index, Query::Node(id))),
    );

    let way_indices: Vec<usize> = matches.indices_of("ways").into_iter().flatten().collect();
    let group_sizes = matches
        .get_occurrences::<String>("ways")
        .into_iter()
        .flatten()
        .map(Iterator::count);

    let mut start = 0;
    for size in group_sizes {
        let group = cli.ways.get(start..start + size).unwrap_or_default();
        let Some((id, keys)) = group.split_first() else {
            bail!("--way requires a way id");
        };
        let id = id
            .parse::<i64>()
            .with_context(|| format!("Invalid way id: {}", id))?;
        let index = way_indices.get(start).copied().unwrap_or(usize::MAX);
        start += size;

        indexed.push((
            index,
            Query::Way {
                id,
                keys: keys.to_vec(),
            },
        ));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, query)| query).collect())
}

fn main() -> Result<()> {
    let (cli, matches) = parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let queries = queries(&cli, &matches)?;
    let mut decoder = MapDecoder::with_config(cli.decoder_config());

    let (map, source) = match &cli.file {
        Some(path) => (load_file(&mut decoder, path)?, path.display().to_string()),
        None => (load_stdin(&mut decoder)?, "<stdin>".to_string()),
    };

    info!(
        "Loaded {} nodes and {} ways from {}",
        map.node_count(),
        map.way_count(),
        source
    );
    debug!("Running {} queries", queries.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    query::run(&map, &source, &queries, &mut out).context("Failed to write query results")?;
    out.flush()?;

    Ok(())
}

fn load_file(decoder: &mut MapDecoder, path: &Path) -> Result<Map> {
    if !path.is_file() {
        bail!("Input file does not exist: {}", path.display());
    }

    let file = File::open(path)
        .with_context(|| format!("Could not open file: {}", path.display()))?;
    decoder
        .decode(BufReader::new(file))
        .with_context(|| format!("Failed to decode map: {}", path.display()))
}

fn load_stdin(decoder: &mut MapDecoder) -> Result<Map> {
    decoder
        .decode(io::stdin().lock())
        .context("Failed to decode map from standard input")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> (Cli, ArgMatches) {
        parse_from(std::iter::once("pbfmap").chain(args.iter().copied())).unwrap()
    }

    fn parse_queries(args: &[&str]) -> Result<Vec<Query>> {
        let (cli, matches) = parse(args);
        queries(&cli, &matches)
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_queries_keep_argument_order() {
        assert_eq!(
            parse_queries(&["-w", "500", "-n", "7", "-b", "-s", "-n", "-3"]).unwrap(),
            vec![
                Query::Way {
                    id: 500,
                    keys: vec![],
                },
                Query::Node(7),
                Query::BoundingBox,
                Query::Summary,
                Query::Node(-3),
            ]
        );
    }

    #[test]
    fn test_way_keys_grouped_per_flag() {
        assert_eq!(
            parse_queries(&["-w", "500", "highway", "name", "-w", "9"]).unwrap(),
            vec![
                Query::Way {
                    id: 500,
                    keys: vec!["highway".into(), "name".into()],
                },
                Query::Way {
                    id: 9,
                    keys: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_way_keys_between_other_queries() {
        assert_eq!(
            parse_queries(&["-s", "-w", "9", "oneway", "-n", "1", "-w", "-4"]).unwrap(),
            vec![
                Query::Summary,
                Query::Way {
                    id: 9,
                    keys: vec!["oneway".into()],
                },
                Query::Node(1),
                Query::Way {
                    id: -4,
                    keys: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_no_queries() {
        assert!(parse_queries(&["-f", "map.osm.pbf"]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_way_id() {
        assert!(parse_queries(&["-w", "main", "highway"]).is_err());
    }

    #[test]
    fn test_invalid_node_id() {
        assert!(parse_from(["pbfmap", "-n", "abc"]).is_err());
    }

    #[test]
    fn test_block_size_limit() {
        let config = parse(&["--max-block-size", "1024"]).0.decoder_config();
        assert_eq!(config.max_blob_size, 1024);
        assert_eq!(config.max_decompressed_size, 1024);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&fixture::query_stream(true)).unwrap();
        file.flush().unwrap();

        let map = load_file(&mut MapDecoder::new(), file.path()).unwrap();
        assert_eq!(map.node_count(), 2);
        assert_eq!(map.way_count(), 1);
    }

    #[test]
    fn test_load_truncated_file() {
        let stream = fixture::query_stream(true);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&stream[..stream.len() - 3]).unwrap();
        file.flush().unwrap();

        let mut decoder = MapDecoder::new();
        let err = load_file(&mut decoder, file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to decode map"));
        assert_eq!(decoder.state(), pbfmap_core::DecodeState::Failed);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.osm.pbf");
        assert!(load_file(&mut MapDecoder::new(), &path).is_err());
    }
}
