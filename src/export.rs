//! Delimited-text serialization of a consolidated table.

use std::io::Write;

use anyhow::{Context, Result};
use csv::QuoteStyle;

use crate::{data::render_cell, table::Table};

pub fn csv_writer<W: Write>(writer: W, delimiter: u8) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Writes the header and every row in table order. Absent cells are empty fields.
pub fn write_table<W: Write>(table: &Table, writer: &mut csv::Writer<W>) -> Result<()> {
    writer
        .write_record(table.columns())
        .context("Writing output headers")?;
    for (row_idx, row) in table.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(|cell| render_cell(cell.as_ref())))
            .with_context(|| format!("Writing row {}", row_idx + 2))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub fn export(table: &Table, delimiter: u8) -> Result<String> {
    let mut writer = csv_writer(Vec::new(), delimiter);
    write_table(table, &mut writer)?;
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Finishing output: {}", err.error()))?;
    String::from_utf8(bytes).context("Output is not valid UTF-8")
}
