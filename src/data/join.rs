use std::collections::HashMap;

use super::model::{cell, Cell, Dataset, Row};

/// One equality condition of a composite join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub left: String,
    pub right: String,
}

impl KeyPair {
    pub fn new(left: &str, right: &str) -> Self {
        KeyPair {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Same column name on both sides.
    pub fn same(column: &str) -> Self {
        Self::new(column, column)
    }
}

/// Text form of a key cell.  Missing keys never match anything.
fn key_text(value: &Cell) -> Option<String> {
    match value {
        Cell::Missing => None,
        other => Some(other.to_field()),
    }
}

fn row_key(row: &Row, columns: &[&str]) -> Option<Vec<String>> {
    columns.iter().map(|c| key_text(cell(row, c))).collect()
}

/// Inner join on a composite key, comparing key cells as text so that
/// identifiers like `010001` keep their leading zeros.
///
/// Every left/right combination inside a matching key group is emitted, in
/// left order and then right order.  A column present on both sides that is
/// not a shared key keeps the left value; the right column is dropped.  A
/// right key column with the same name as its left partner is dropped too.
///
/// An empty result is valid and not an error.
pub fn inner_join(left: &Dataset, right: &Dataset, keys: &[KeyPair]) -> Dataset {
    let left_keys: Vec<&str> = keys.iter().map(|k| k.left.as_str()).collect();
    let right_keys: Vec<&str> = keys.iter().map(|k| k.right.as_str()).collect();

    // Right-side columns that make it into the output.
    let carried: Vec<&String> = right
        .columns
        .iter()
        .filter(|c| !left.has_column(c.as_str()))
        .filter(|c| !keys.iter().any(|k| &k.right == *c && k.left == k.right))
        .collect();

    let mut columns = left.columns.clone();
    columns.extend(carried.iter().map(|c| c.to_string()));

    // Index right rows by key, preserving input order within each group.
    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        if let Some(key) = row_key(row, &right_keys) {
            index.entry(key).or_default().push(i);
        }
    }

    let mut rows = Vec::new();
    for left_row in &left.rows {
        let Some(key) = row_key(left_row, &left_keys) else {
            continue;
        };
        let Some(matches) = index.get(&key) else {
            continue;
        };
        for &i in matches {
            let right_row = &right.rows[i];
            let mut merged = left_row.clone();
            for col in &carried {
                if let Some(v) = right_row.get(col.as_str()) {
                    merged.insert(col.to_string(), v.clone());
                }
            }
            rows.push(merged);
        }
    }

    if rows.is_empty() {
        log::debug!("inner join on {left_keys:?} matched no rows");
    } else {
        log::debug!(
            "inner join on {left_keys:?}: {} x {} rows → {}",
            left.len(),
            right.len(),
            rows.len()
        );
    }

    Dataset::new(columns, rows)
}
