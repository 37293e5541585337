//! Schema reconciliation: growing the accumulated column set as new sources
//! reveal columns it has not seen yet.

use log::debug;
use serde::Serialize;

use crate::table::Table;

/// Columns appended to the accumulated table by one reconciliation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDelta {
    pub added: Vec<String>,
}

impl SchemaDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Lists the columns of `incoming` that `accumulated` lacks, in `incoming` order.
///
/// The key column is never part of the delta.
pub fn column_delta(accumulated: &Table, incoming: &Table, key: &str) -> SchemaDelta {
    let added = incoming
        .columns()
        .iter()
        .filter(|name| name.as_str() != key && !accumulated.has_column(name))
        .cloned()
        .collect();
    SchemaDelta { added }
}

/// Extends `accumulated` with every column of `incoming` it does not yet have.
///
/// Rows that predate a new column hold an absent value for it. Reconciling a
/// column that is already known is a no-op.
pub fn reconcile_schema(accumulated: &mut Table, incoming: &Table, key: &str) -> SchemaDelta {
    let delta = column_delta(accumulated, incoming, key);
    for name in &delta.added {
        accumulated.add_column(name);
    }
    if !delta.is_empty() {
        debug!("Added column(s) {:?}", delta.added);
    }
    delta
}
