use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Cell – a single value in a dataset column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell.  Everything loads as `Text`; coercion rules turn
/// selected columns into `Number`.
/// Using `BTreeMap` / `BTreeSet` downstream so `Cell` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    /// Always finite: coercion maps NaN / infinities to `Missing`.
    Number(f64),
    Missing,
}

// -- Manual Eq/Ord so we can put Cell in BTreeSet --

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Cell::*;
        fn discriminant(v: &Cell) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Text(_) => 2,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Text(s) => s.hash(state),
            Cell::Number(f) => f.to_bits().hash(state),
            Cell::Missing => {}
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            // -0.0 + 0.0 == +0.0, so both zeros share one bit pattern
            Cell::Number(v + 0.0)
        } else {
            Cell::Missing
        }
    }
}

impl Cell {
    /// Numeric view of the cell, `None` for text and missing values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// The cell as it appears in a CSV field.  `Missing` is the empty field
    /// and numbers use Rust's shortest round-trip form.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::Missing => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one record of a dataset
// ---------------------------------------------------------------------------

/// A single row: column_name → cell.  Columns absent from the map read as
/// `Missing`.
pub type Row = BTreeMap<String, Cell>;

static MISSING: Cell = Cell::Missing;

/// Read a cell from a row, treating absent columns as missing.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
    row.get(column).unwrap_or(&MISSING)
}

// ---------------------------------------------------------------------------
// Dataset – an ordered table
// ---------------------------------------------------------------------------

/// An ordered sequence of rows with a fixed, ordered column set.
///
/// Every operation returns a new dataset; published datasets are never
/// mutated by pipeline stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Column names in output order.
    pub columns: Vec<String>,
    /// All rows.
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Dataset { columns, rows }
    }

    /// Same columns, no rows.
    pub fn empty_like(&self) -> Self {
        Dataset {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// Same columns, the given rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// All cells of one column, in row order.
    pub fn column_values(&self, column: &str) -> Vec<&Cell> {
        self.rows.iter().map(|row| cell(row, column)).collect()
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<Cell> {
        self.rows
            .iter()
            .map(|row| cell(row, column).clone())
            .collect()
    }

    /// Keep only the named columns, in the given order.  Unknown names are
    /// carried as all-missing columns.
    pub fn select(&self, columns: &[&str]) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                    .collect()
            })
            .collect();
        Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Rename a column.  An existing column named `to` is replaced.
    pub fn rename(&self, from: &str, to: &str) -> Self {
        if from == to || !self.has_column(from) {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| c.as_str() != to)
            .map(|c| if c == from { to.to_string() } else { c.clone() })
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(to);
                if let Some(v) = row.remove(from) {
                    row.insert(to.to_string(), v);
                }
                row
            })
            .collect();
        Dataset { columns, rows }
    }

    /// Remove the named columns.
    pub fn drop_columns(&self, columns: &[&str]) -> Self {
        let keep: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !columns.contains(c))
            .collect();
        self.select(&keep)
    }

    /// Drop rows in which any of the named columns is missing.
    pub fn drop_missing(&self, columns: &[&str]) -> Self {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| columns.iter().all(|c| !cell(row, c).is_missing()))
            .cloned()
            .collect();
        let dropped = self.len() - rows.len();
        if dropped > 0 {
            log::debug!("dropped {dropped} rows with missing {columns:?}");
        }
        self.with_rows(rows)
    }

    /// Trim leading/trailing whitespace from a text column.  Cells that
    /// become empty turn into `Missing`.
    pub fn trim_text(&self, column: &str) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(Cell::Text(s)) = row.get(column) {
                    let trimmed = Cell::from(s.trim());
                    row.insert(column.to_string(), trimmed);
                }
                row
            })
            .collect();
        self.with_rows(rows)
    }

    /// Add a column (appended to the column list) or replace an existing one
    /// with values computed per row.
    pub fn with_column<F>(&self, column: &str, mut f: F) -> Self
    where
        F: FnMut(&Row) -> Cell,
    {
        let mut columns = self.columns.clone();
        if !self.has_column(column) {
            columns.push(column.to_string());
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let value = f(row);
                let mut row = row.clone();
                row.insert(column.to_string(), value);
                row
            })
            .collect();
        Dataset { columns, rows }
    }
}

/// Build a row from `(column, value)` pairs; empty strings become missing.
pub fn row_from_pairs(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Cell::from(*v)))
        .collect()
}
