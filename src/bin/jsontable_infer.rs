//! jsontable-infer: print the table schema inferred from a JSON document
//!
//! Usage:
//!   # Whole document, widening types across every row
//!   jsontable-infer data.json
//!
//!   # Read from stdin
//!   echo '[{"id": 1, "email": "alice@example.com"}]' | jsontable-infer
//!
//!   # Schema a stream would freeze from its first 500 elements
//!   jsontable-infer --first-batch 500 large.json --compact

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jsontable::decode::ElementReader;
use jsontable::{ConnectorConfig, Flattener, FrozenSchema, JsonConnector, Schema, Source};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsontable-infer")]
#[command(about = "Infer the tabular schema of a JSON document", long_about = None)]
struct Args {
    /// Input path or file:// URI (use stdin if omitted)
    #[arg(value_name = "SOURCE")]
    input: Option<String>,

    /// Infer from the first N elements only, as a streaming load would
    #[arg(long, value_name = "N")]
    first_batch: Option<usize>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Maximum nesting depth to flatten
    #[arg(long)]
    max_depth: Option<usize>,

    /// Skip string format detection
    #[arg(long)]
    no_formats: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ConnectorConfig::default().with_detect_formats(!args.no_formats);
    if let Some(depth) = args.max_depth {
        config = config.with_max_depth(depth);
    }

    let source = match &args.input {
        Some(locator) => Source::from_locator(locator)
            .with_context(|| format!("Invalid source: {locator}"))?,
        None => Source::from_reader(std::io::stdin()),
    };

    let schema = match args.first_batch {
        Some(0) => bail!("--first-batch must be positive"),
        Some(n) => first_batch_schema(source, n, &config)?,
        None => {
            let connector = JsonConnector::new(config)?;
            connector
                .get_data(source)
                .context("Failed to load document")?
                .schema
        }
    };

    if schema.is_empty() {
        tracing::warn!("no columns found in input");
    }

    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };
    println!("{output}");

    Ok(())
}

/// Schema frozen from the first `n` elements, reading no further.
fn first_batch_schema(source: Source, n: usize, config: &ConnectorConfig) -> Result<Schema> {
    let flattener = Flattener::from_config(config);
    let mut reader = ElementReader::with_chunk_size(source.open()?, config.read_chunk_size);

    let mut rows = Vec::with_capacity(n);
    while rows.len() < n {
        match reader.next_element().context("Failed to read element")? {
            Some(element) => rows.push(flattener.flatten_record(&element)?),
            None => break,
        }
    }

    Ok(FrozenSchema::from_first_batch(&rows, config.detect_formats).into_schema())
}
