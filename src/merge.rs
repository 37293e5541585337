//! Merge orchestration: the ordered, best-effort fold over all sources.
//!
//! Each source is loaded, checked for the key column and for unique keys,
//! then folded into the accumulator (schema first, rows second). A source
//! that fails any of those checks is skipped with a [`MergeWarning`]; the
//! merge only fails outright when no source at all could be used.

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    loader::{self, LoadError, LoadOptions},
    rows::ConsolidatedTable,
    table::{Source, Table},
};

/// Why a source was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarningReason {
    #[error("{0}")]
    LoadFailed(LoadError),
    #[error("missing key column '{key}'")]
    MissingKey { key: String },
}

impl WarningReason {
    pub fn code(&self) -> &'static str {
        match self {
            WarningReason::LoadFailed(_) => "LOAD_FAILED",
            WarningReason::MissingKey { .. } => "MISSING_KEY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWarning {
    pub source_index: usize,
    pub source_name: String,
    pub reason: WarningReason,
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped source #{} '{}': {}",
            self.source_index + 1,
            self.source_name,
            self.reason
        )
    }
}

impl Serialize for MergeWarning {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("MergeWarning", 4)?;
        state.serialize_field("source_index", &self.source_index)?;
        state.serialize_field("source_name", &self.source_name)?;
        state.serialize_field("reason", self.reason.code())?;
        state.serialize_field("message", &self.reason.to_string())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeFailure {
    #[error("no input sources were provided")]
    NoSources,
    #[error("the key column name must not be empty")]
    EmptyKey,
    #[error("no valid sources to merge ({} skipped)", .warnings.len())]
    NoValidSources { warnings: Vec<MergeWarning> },
}

impl MergeFailure {
    pub fn warnings(&self) -> &[MergeWarning] {
        match self {
            MergeFailure::NoValidSources { warnings } => warnings,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub sources: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub rows: usize,
    pub columns: usize,
    pub columns_added: usize,
    pub rows_updated: usize,
    pub rows_inserted: usize,
    pub cells_filled: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub table: Table,
    pub warnings: Vec<MergeWarning>,
    pub summary: MergeSummary,
}

/// Consolidates `sources`, in order, into one table keyed by `key`.
pub fn merge(
    sources: &[Source],
    key: &str,
    options: &LoadOptions,
) -> Result<MergeOutcome, MergeFailure> {
    if sources.is_empty() {
        return Err(MergeFailure::NoSources);
    }
    let key = key.trim();
    if key.is_empty() {
        return Err(MergeFailure::EmptyKey);
    }

    let mut warnings = Vec::new();
    let mut summary = MergeSummary {
        sources: sources.len(),
        ..MergeSummary::default()
    };
    let mut accumulated: Option<ConsolidatedTable> = None;

    for (source_index, source) in sources.iter().enumerate() {
        let table = match accept_source(source, key, options) {
            Ok(table) => table,
            Err(reason) => {
                let warning = MergeWarning {
                    source_index,
                    source_name: source.name.clone(),
                    reason,
                };
                warn!("{warning}");
                warnings.push(warning);
                continue;
            }
        };
        summary.accepted += 1;

        match accumulated.as_mut() {
            None => {
                debug!(
                    "Seeding consolidated table from '{}' ({} row(s))",
                    source.name,
                    table.row_count()
                );
                summary.rows_inserted += table.row_count();
                accumulated = Some(ConsolidatedTable::seed(table, key));
            }
            Some(consolidated) => {
                let (schema_delta, row_delta) = consolidated.reconcile(table);
                summary.columns_added += schema_delta.added.len();
                summary.rows_updated += row_delta.updated;
                summary.rows_inserted += row_delta.inserted;
                summary.cells_filled += row_delta.filled_cells;
                debug!(
                    "Merged '{}': {} new column(s), {} updated row(s), {} new row(s)",
                    source.name,
                    schema_delta.added.len(),
                    row_delta.updated,
                    row_delta.inserted
                );
            }
        }
    }

    summary.skipped = warnings.len();
    let Some(consolidated) = accumulated else {
        return Err(MergeFailure::NoValidSources { warnings });
    };
    let table = consolidated.into_table();
    summary.rows = table.row_count();
    summary.columns = table.column_count();
    info!(
        "Consolidated {} of {} source(s) into {} row(s) across {} column(s)",
        summary.accepted, summary.sources, summary.rows, summary.columns
    );
    Ok(MergeOutcome {
        table,
        warnings,
        summary,
    })
}

fn accept_source(
    source: &Source,
    key: &str,
    options: &LoadOptions,
) -> Result<Table, WarningReason> {
    let table = loader::load(source, options).map_err(WarningReason::LoadFailed)?;
    if !table.has_column(key) {
        return Err(WarningReason::MissingKey {
            key: key.to_string(),
        });
    }
    loader::validate_keys(&table, key).map_err(WarningReason::LoadFailed)?;
    Ok(table)
}
