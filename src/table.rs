//! In-memory table model shared by the loader, reconcilers, and exporter.
//!
//! A [`Table`] keeps its columns in insertion order and stores each row as a
//! vector of cells aligned with those columns, so every row always holds a
//! (possibly absent) value for every declared column.

use std::collections::HashMap;

use crate::data::{Field, key_string, normalize_key};

pub type Cell = Option<Field>;
pub type Row = Vec<Cell>;

/// One raw input: a display name (usually the file name) and its bytes, or
/// the reason they could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    content: Result<Vec<u8>, String>,
}

impl Source {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Ok(content.into()),
        }
    }

    /// A source whose bytes never arrived. Loading it fails, so a merge
    /// skips it with a warning like any other unusable input.
    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Err(reason.into()),
        }
    }

    pub fn content(&self) -> Result<&[u8], &str> {
        self.content.as_deref().map_err(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given columns.
    ///
    /// Returns `Err` with the first repeated name when the columns are not
    /// unique.
    pub fn with_columns<I, S>(columns: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::default();
        for name in columns {
            let name = name.into();
            if table.positions.contains_key(&name) {
                return Err(name);
            }
            table.positions.insert(name.clone(), table.columns.len());
            table.columns.push(name);
        }
        Ok(table)
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            positions: self.positions.clone(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Appends a column, filling every existing row with an absent value.
    /// Returns `false` when the column already exists.
    pub fn add_column(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.positions.insert(name.to_string(), self.columns.len());
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        true
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Field> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> Option<&mut Row> {
        self.rows.get_mut(row)
    }

    pub(crate) fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns the row whose key column compares equal to `key`.
    pub fn find_row(&self, key_column: &str, key: &str) -> Option<&Row> {
        let idx = self.column_index(key_column)?;
        let key = normalize_key(key);
        self.rows.iter().find(|row| {
            key_string(row.get(idx).and_then(Option::as_ref)).is_some_and(|value| value == key)
        })
    }
}
