//! Row reconciliation and the consolidated accumulator.
//!
//! [`ConsolidatedTable`] pairs the merged [`Table`] with a hash index from
//! normalized key to row position. [`reconcile_rows`] folds one incoming,
//! schema-aligned table into it:
//!
//! - rows whose key is already known only fill cells that are still absent
//!   (the first source to supply a value keeps it);
//! - rows with a new key are appended in the order they are encountered.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::{
    data::{key_string, normalize_key},
    schema::{SchemaDelta, reconcile_schema},
    table::{Row, Table},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    table: Table,
    key: String,
    index: HashMap<String, usize>,
}

/// Outcome counts for one row reconciliation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowDelta {
    pub updated: usize,
    pub inserted: usize,
    pub filled_cells: usize,
}

impl ConsolidatedTable {
    /// Starts the accumulator from the first accepted table.
    pub fn seed(table: Table, key: &str) -> Self {
        let mut consolidated = Self {
            table: table.empty_like(),
            key: key.to_string(),
            index: HashMap::with_capacity(table.row_count()),
        };
        reconcile_rows(&mut consolidated, table);
        consolidated
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&normalize_key(key))
    }

    /// Folds `incoming` into the accumulator: new columns first, then rows.
    pub fn reconcile(&mut self, incoming: Table) -> (SchemaDelta, RowDelta) {
        let schema_delta = reconcile_schema(&mut self.table, &incoming, &self.key);
        let row_delta = reconcile_rows(self, incoming);
        (schema_delta, row_delta)
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

/// Merges the rows of `incoming` into `accumulated` by key.
///
/// `incoming` columns missing from the accumulated schema are ignored, so the
/// schema must be reconciled first; [`ConsolidatedTable::reconcile`] does both.
pub fn reconcile_rows(accumulated: &mut ConsolidatedTable, incoming: Table) -> RowDelta {
    let mut delta = RowDelta::default();
    let Some(incoming_key_idx) = incoming.column_index(&accumulated.key) else {
        warn!(
            "Incoming table has no key column '{}'; no rows merged",
            accumulated.key
        );
        return delta;
    };
    let mapping = incoming
        .columns()
        .iter()
        .map(|name| accumulated.table.column_index(name))
        .collect::<Vec<_>>();

    let mut updates: Vec<(usize, Row)> = Vec::new();
    let mut insertions: Vec<(String, Row)> = Vec::new();
    for (row_idx, row) in incoming.into_rows().into_iter().enumerate() {
        let Some(key) = key_string(row[incoming_key_idx].as_ref()) else {
            warn!("Skipping incoming row {} without a key value", row_idx + 2);
            continue;
        };
        match accumulated.index.get(&key) {
            Some(position) => updates.push((*position, row)),
            None => insertions.push((key, row)),
        }
    }

    for (position, row) in updates {
        delta.filled_cells += fill_gaps(&mut accumulated.table, position, &mapping, row);
        delta.updated += 1;
    }

    let width = accumulated.table.column_count();
    for (key, row) in insertions {
        if let Some(position) = accumulated.index.get(&key).copied() {
            // Repeated key within this batch.
            delta.filled_cells += fill_gaps(&mut accumulated.table, position, &mapping, row);
            delta.updated += 1;
            continue;
        }
        let mut aligned: Row = vec![None; width];
        for (cell, target) in row.into_iter().zip(&mapping) {
            if let Some(target) = target {
                aligned[*target] = cell;
            }
        }
        accumulated
            .index
            .insert(key, accumulated.table.row_count());
        accumulated.table.push_row(aligned);
        delta.inserted += 1;
    }

    debug!(
        "Reconciled rows: {} updated, {} inserted, {} cell(s) filled",
        delta.updated, delta.inserted, delta.filled_cells
    );
    delta
}

fn fill_gaps(table: &mut Table, position: usize, mapping: &[Option<usize>], row: Row) -> usize {
    let Some(existing) = table.row_mut(position) else {
        return 0;
    };
    let mut filled = 0;
    for (cell, target) in row.into_iter().zip(mapping) {
        let (Some(value), Some(target)) = (cell, target) else {
            continue;
        };
        if existing[*target].is_none() {
            existing[*target] = Some(value);
            filled += 1;
        }
    }
    filled
}
