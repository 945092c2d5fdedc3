use std::collections::{BTreeMap, BTreeSet};

use super::model::{cell, Cell, Dataset};

// ---------------------------------------------------------------------------
// Filter predicate: which raw values are accepted per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of accepted raw values.
/// A row passes when, for every listed column, its raw text is in the set.
pub type FilterState = BTreeMap<String, BTreeSet<String>>;

/// Build an accepted-value set from anything string-like.
pub fn value_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Return indices of rows that pass all filters.
///
/// A row passes a column filter when:
/// * The filter set for that column is empty → nothing selected → fails
/// * The row's cell for that column is missing → fails
/// * The cell's raw text is in the selected set → passes
pub fn filtered_indices(dataset: &Dataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            for (col, selected) in filters {
                if selected.is_empty() {
                    // Nothing selected for this column → hide everything
                    return false;
                }
                match cell(row, col) {
                    Cell::Missing => return false,
                    value => {
                        if !selected.contains(&value.to_field()) {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}

/// Keep only the rows that pass all filters.
pub fn filter_rows(dataset: &Dataset, filters: &FilterState) -> Dataset {
    let rows = filtered_indices(dataset, filters)
        .into_iter()
        .map(|i| dataset.rows[i].clone())
        .collect();
    let out = dataset.with_rows(rows);
    log::debug!(
        "filter on {:?}: kept {} of {} rows",
        filters.keys().collect::<Vec<_>>(),
        out.len(),
        dataset.len()
    );
    out
}

// ---------------------------------------------------------------------------
// Coercion rules
// ---------------------------------------------------------------------------

/// How a column's raw text turns into a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// Remove `strip` characters and whitespace, then parse a decimal.
    Decimal { strip: Vec<char> },
    /// Parse an integer category within `min..=max` (e.g. a 1–5 star rating).
    Ordinal { min: i64, max: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoercionRule {
    pub column: String,
    pub coercion: Coercion,
}

impl CoercionRule {
    /// Plain decimal column such as a rate or a spending ratio.
    pub fn decimal(column: &str) -> Self {
        CoercionRule {
            column: column.to_string(),
            coercion: Coercion::Decimal { strip: Vec::new() },
        }
    }

    /// Dollar amount formatted like `$1,234.50`.
    pub fn currency(column: &str) -> Self {
        CoercionRule {
            column: column.to_string(),
            coercion: Coercion::Decimal {
                strip: vec!['$', ','],
            },
        }
    }

    pub fn ordinal(column: &str, min: i64, max: i64) -> Self {
        CoercionRule {
            column: column.to_string(),
            coercion: Coercion::Ordinal { min, max },
        }
    }

    /// Coerce a single cell.  Failures yield [`Cell::Missing`].
    pub fn apply(&self, value: &Cell) -> Cell {
        match (&self.coercion, value) {
            (_, Cell::Missing) => Cell::Missing,
            (Coercion::Decimal { strip }, Cell::Text(raw)) => {
                parse_decimal(raw, strip).map_or(Cell::Missing, Cell::from)
            }
            (Coercion::Decimal { .. }, Cell::Number(v)) => Cell::from(*v),
            (Coercion::Ordinal { min, max }, Cell::Text(raw)) => {
                parse_ordinal(raw, *min, *max).map_or(Cell::Missing, |v| Cell::Number(v as f64))
            }
            (Coercion::Ordinal { min, max }, Cell::Number(v)) => {
                if v.fract() == 0.0 && *v >= *min as f64 && *v <= *max as f64 {
                    Cell::Number(*v)
                } else {
                    Cell::Missing
                }
            }
        }
    }
}

/// Parse a decimal after removing the `strip` characters.
/// `"$1,234.50"` with `['$', ',']` → `1234.5`; `"Not Available"` → `None`.
pub fn parse_decimal(raw: &str, strip: &[char]) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !strip.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_ordinal(raw: &str, min: i64, max: i64) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

/// Apply coercion rules to every row.  Columns without a rule are untouched.
pub fn coerce(dataset: &Dataset, rules: &[CoercionRule]) -> Dataset {
    let mut failures = 0usize;
    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for rule in rules {
                if let Some(value) = row.get_mut(&rule.column) {
                    let coerced = rule.apply(value);
                    if coerced.is_missing() && !value.is_missing() {
                        failures += 1;
                    }
                    *value = coerced;
                }
            }
            row
        })
        .collect();
    if failures > 0 {
        log::debug!("{failures} cells could not be coerced and are now missing");
    }
    dataset.with_rows(rows)
}

/// Filter rows on raw values, then coerce the surviving rows.
///
/// The predicate runs first so that coercion never decides which rows match.
pub fn filter_and_coerce(dataset: &Dataset, filters: &FilterState, rules: &[CoercionRule]) -> Dataset {
    coerce(&filter_rows(dataset, filters), rules)
}
