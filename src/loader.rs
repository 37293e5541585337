//! Turns one raw [`Source`] into a validated [`Table`].
//!
//! Loading is pure: the source bytes are decoded, parsed as delimited text
//! with a mandatory header row, and every cell keeps its text alongside an
//! inferred value. Failures are reported as [`LoadError`] so the caller can decide to
//! skip the source rather than abort.

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use thiserror::Error;

use crate::{
    data::{key_string, parse_cell},
    io_utils,
    table::{Source, Table},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("the file is empty or contains no data rows")]
    Empty,
    #[error("the file has no columns")]
    NoColumns,
    #[error("unable to read the file: {message}")]
    Unreadable { message: String },
    #[error("unable to parse the file: {message}")]
    Parse { message: String },
    #[error("column '{column}' appears more than once in the header")]
    DuplicateColumn { column: String },
    #[error("row {row} has no value for key column '{key}'")]
    BlankKey { key: String, row: usize },
    #[error("key '{value}' appears on rows {first_row} and {row}")]
    DuplicateKey {
        value: String,
        first_row: usize,
        row: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

pub fn load(source: &Source, options: &LoadOptions) -> Result<Table, LoadError> {
    let bytes = source.content().map_err(|message| LoadError::Unreadable {
        message: message.to_string(),
    })?;
    let text = io_utils::decode_bytes(bytes, options.encoding).map_err(|err| {
        LoadError::Parse {
            message: err.to_string(),
        }
    })?;
    if text.trim().is_empty() {
        return Err(LoadError::Empty);
    }

    let mut reader = io_utils::open_csv_reader(text.as_bytes(), options.delimiter);
    let headers = reader
        .headers()
        .map_err(|err| parse_error(&err))?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();
    if headers.iter().all(|name| name.is_empty()) {
        return Err(LoadError::NoColumns);
    }
    let headers = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            if name.is_empty() {
                format!("unnamed_{}", idx + 1)
            } else {
                name
            }
        })
        .collect::<Vec<_>>();
    let mut table =
        Table::with_columns(headers).map_err(|column| LoadError::DuplicateColumn { column })?;

    for record in reader.records() {
        let record = record.map_err(|err| parse_error(&err))?;
        table.push_row(record.iter().map(parse_cell).collect());
    }
    if table.is_empty() {
        return Err(LoadError::Empty);
    }

    debug!(
        "Loaded '{}': {} row(s) across {} column(s)",
        source.name,
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Checks that every row carries a key value and that no key repeats.
///
/// Reported row numbers count the header as row 1.
pub fn validate_keys(table: &Table, key: &str) -> Result<(), LoadError> {
    let Some(key_idx) = table.column_index(key) else {
        return Ok(());
    };
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(table.row_count());
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_number = row_idx + 2;
        let value = key_string(row[key_idx].as_ref()).ok_or_else(|| LoadError::BlankKey {
            key: key.to_string(),
            row: row_number,
        })?;
        if let Some(first_row) = seen.get(&value) {
            return Err(LoadError::DuplicateKey {
                value,
                first_row: *first_row,
                row: row_number,
            });
        }
        seen.insert(value, row_number);
    }
    Ok(())
}

fn parse_error(err: &csv::Error) -> LoadError {
    LoadError::Parse {
        message: err.to_string(),
    }
}
