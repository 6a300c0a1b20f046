//! Domain models shared by the parser, the transforms and the exporters.
//!
//! - [`Table`] - ordered named columns over row-major cells
//! - [`Row`] - a borrowed row with name-based lookup
//!
//! Cells are [`serde_json::Value`]s: CSV input only ever produces strings and
//! `null` (empty field), but callers building tables in code may use numbers
//! and booleans too. Transforms coerce cells to text explicitly through
//! [`crate::transform::columns::cell_text`] when they need to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Table
// =============================================================================

/// An in-memory table: unique column names in insertion order, plus rows that
/// all have exactly one cell per column.
///
/// Deserialization goes through [`Table::from_rows`], so ragged input rows
/// are padded or truncated like any other construction path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Wire shape of a [`Table`] before row normalization.
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Table::from_rows(raw.columns, raw.rows)
    }
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from columns and rows.
    ///
    /// Rows shorter than the header are padded with `null`, longer rows are
    /// truncated, so the equal-length invariant always holds.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Build a table of string cells. Mostly useful in tests and examples.
    pub fn from_strings<C, R, S>(columns: C, rows: R) -> Self
    where
        C: IntoIterator<Item = S>,
        R: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Value::String(s.into())).collect())
            .collect();
        Self::from_rows(columns, rows)
    }

    /// Append a row, normalizing its length to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Get a row by position.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row { table: self, index })
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).map(move |index| Row { table: self, index })
    }

    /// Raw row-major cells.
    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Cell at (row, column name). `None` when either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |r| r.get(index))
    }

    /// The first `n` rows as a new table (preview).
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows as JSON objects keyed by column name, in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows().map(|r| Value::Object(r.to_map())).collect()
    }

    /// Consume the table into its parts.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

// =============================================================================
// Row
// =============================================================================

/// A borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    /// Cell by column name; `None` when the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.table
            .column_index(column)
            .map(|col| &self.table.rows[self.index][col])
    }

    /// Cell by column position.
    pub fn at(&self, col: usize) -> Option<&'a Value> {
        self.table.rows[self.index].get(col)
    }

    /// All cells in column order.
    pub fn values(&self) -> &'a [Value] {
        &self.table.rows[self.index]
    }

    /// Row as a JSON object, keys in column order.
    pub fn to_map(&self) -> Map<String, Value> {
        self.table
            .columns
            .iter()
            .cloned()
            .zip(self.values().iter().cloned())
            .collect()
    }
}
