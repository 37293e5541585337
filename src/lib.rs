pub mod cli;
pub mod data;
pub mod export;
pub mod io_utils;
pub mod loader;
pub mod merge;
pub mod preview;
pub mod rows;
pub mod schema;
pub mod table;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands},
    loader::LoadOptions,
    merge::{MergeSummary, MergeWarning},
    table::Table,
};

pub use crate::{
    loader::{LoadError, load},
    merge::{MergeFailure, MergeOutcome, merge},
    table::Source,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_consolidate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => handle_merge(&args),
        Commands::Headers(args) => handle_headers(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    summary: &'a MergeSummary,
    warnings: &'a [MergeWarning],
}

fn handle_merge(args: &cli::MergeArgs) -> Result<()> {
    let first = args
        .inputs
        .first()
        .ok_or_else(|| anyhow!("At least one input file must be provided"))?;
    let options = LoadOptions {
        delimiter: io_utils::resolve_input_delimiter(first, args.delimiter),
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
    };
    let output_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        options.delimiter,
    );
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    info!(
        "Merging {} file(s) on key '{}' with delimiter '{}'",
        args.inputs.len(),
        args.key,
        printable_delimiter(options.delimiter)
    );

    let sources = args
        .inputs
        .iter()
        .map(|path| {
            io_utils::read_source(path).unwrap_or_else(|err| {
                debug!("Could not read {path:?}: {err:#}");
                Source::unreadable(io_utils::source_name(path), format!("{err:#}"))
            })
        })
        .collect::<Vec<_>>();
    let outcome = merge::merge(&sources, &args.key, &options)?;

    if args.strict && !outcome.warnings.is_empty() {
        bail!(
            "Refusing to write a partial merge in strict mode: {}",
            outcome.warnings.iter().join("; ")
        );
    }

    let text = export::export(&outcome.table, output_delimiter)?;
    io_utils::write_output(args.output.as_deref(), &text, output_encoding)?;

    if let Some(path) = &args.summary {
        write_summary(path, &outcome.summary, &outcome.warnings)?;
    }
    if let Some(rows) = args.preview {
        match args.output.as_deref() {
            Some(path) if !io_utils::is_dash(path) => {
                print!("{}", preview::render_preview(&outcome.table, rows));
            }
            _ => warn!("Skipping preview because the merged CSV is written to stdout"),
        }
    }

    let summary = &outcome.summary;
    info!(
        "Merged {} of {} file(s): {} row(s), {} column(s), {} skipped",
        summary.accepted, summary.sources, summary.rows, summary.columns, summary.skipped
    );
    if let Some(path) = &args.output {
        info!("Wrote merged output to {path:?}");
    }
    Ok(())
}

fn write_summary(path: &Path, summary: &MergeSummary, warnings: &[MergeWarning]) -> Result<()> {
    let report = SummaryReport { summary, warnings };
    let json = serde_json::to_string_pretty(&report).context("Serializing merge summary")?;
    fs::write(path, json).with_context(|| format!("Writing summary to {path:?}"))?;
    debug!("Summary written to {path:?}");
    Ok(())
}

fn load_single(path: &Path, delimiter: Option<u8>, encoding: Option<&str>) -> Result<Table> {
    let options = LoadOptions {
        delimiter: io_utils::resolve_input_delimiter(path, delimiter),
        encoding: io_utils::resolve_encoding(encoding)?,
    };
    let source = io_utils::read_source(path)?;
    loader::load(&source, &options).with_context(|| format!("Loading {path:?}"))
}

fn handle_headers(args: &cli::HeadersArgs) -> Result<()> {
    let table = load_single(&args.input, args.delimiter, args.input_encoding.as_deref())?;
    let rows = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| vec![(idx + 1).to_string(), name.clone()])
        .collect::<Vec<_>>();
    let headers = vec!["#".to_string(), "column".to_string()];
    print!("{}", preview::render_text_table(&headers, &rows));
    info!(
        "Listed {} column(s) from {:?}",
        table.column_count(),
        args.input
    );
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let table = load_single(&args.input, args.delimiter, args.input_encoding.as_deref())?;
    print!("{}", preview::render_preview(&table, args.rows));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        args.rows.min(table.row_count()),
        table.row_count(),
        args.input
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
