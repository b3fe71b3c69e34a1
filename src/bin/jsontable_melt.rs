//! jsontable-melt: flatten a JSON document into rows
//!
//! Usage:
//!   # Load the whole document and print it back as flat rows (JSON Lines)
//!   jsontable-melt data.json
//!
//!   # Stream a large root array in batches of 1000 into a file
//!   jsontable-melt --batch-size 1000 --output rows.jsonl large.json
//!
//!   # Load, then rebuild the nested JSON from the table
//!   jsontable-melt --unflatten data.json
//!
//!   # Same, indented
//!   jsontable-melt --unflatten --pretty data.json

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use jsontable::{
    Batch, BatchSink, ConnectorConfig, JsonConnector, JsonLinesSink, NestingOverflow, Source,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jsontable-melt")]
#[command(about = "Flatten nested JSON into table rows", long_about = None)]
struct Args {
    /// Input path or file:// URI (use stdin if omitted)
    #[arg(value_name = "SOURCE")]
    input: Option<String>,

    /// Stream the root array in batches of this many elements
    #[arg(long, short = 'b', conflicts_with = "unflatten")]
    batch_size: Option<usize>,

    /// Output file (stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Print the document rebuilt from the table instead of flat rows
    #[arg(long)]
    unflatten: bool,

    /// Indent the rebuilt document (with --unflatten)
    #[arg(long, requires = "unflatten")]
    pretty: bool,

    /// Keep subtrees deeper than --max-depth as one nested column instead of failing
    #[arg(long)]
    embed_overflow: bool,

    /// Fail on values that cannot be coerced to their column type
    #[arg(long)]
    strict: bool,

    /// Maximum nesting depth to flatten
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ConnectorConfig::default().with_strict_coercion(args.strict);
    if let Some(depth) = args.max_depth {
        config = config.with_max_depth(depth);
    }
    if args.embed_overflow {
        config = config.with_nesting_overflow(NestingOverflow::Embed);
    }
    let connector = JsonConnector::new(config)?;

    let source = match &args.input {
        Some(locator) => Source::from_locator(locator)
            .with_context(|| format!("Invalid source: {locator}"))?,
        None => Source::from_reader(std::io::stdin()),
    };

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {path}"))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    match args.batch_size {
        Some(batch_size) => stream(&connector, source, output, batch_size),
        None => {
            let shape = match (args.unflatten, args.pretty) {
                (false, _) => Output::Rows,
                (true, false) => Output::Document,
                (true, true) => Output::PrettyDocument,
            };
            load(&connector, source, output, shape)
        }
    }
}

/// What a whole-document load prints.
enum Output {
    Rows,
    Document,
    PrettyDocument,
}

fn stream(
    connector: &JsonConnector,
    source: Source,
    output: Box<dyn Write>,
    batch_size: usize,
) -> Result<()> {
    let load = connector
        .get_storage_data(source, JsonLinesSink::new(output), batch_size)
        .context("Failed to stream document")?;

    tracing::info!(
        rows = load.sink.rows_written(),
        batches = load.summary.batches,
        "rows written"
    );
    Ok(())
}

fn load(
    connector: &JsonConnector,
    source: Source,
    mut output: Box<dyn Write>,
    shape: Output,
) -> Result<()> {
    let table = connector.get_data(source).context("Failed to load document")?;

    let text = match shape {
        Output::Rows => None,
        Output::Document => Some(connector.serialize(&table)?),
        Output::PrettyDocument => Some(connector.serialize_pretty(&table)?),
    };
    if let Some(text) = text {
        writeln!(output, "{text}").context("Failed to write output")?;
        output.flush().context("Failed to flush output")?;
        return Ok(());
    }

    let mut sink = JsonLinesSink::new(output);
    let batch = Batch {
        index: 1,
        rows: table.rows,
    };
    sink.append_batch(batch, &table.schema)?;
    sink.flush()?;
    Ok(())
}
