use std::collections::BTreeMap;

use super::model::{cell, Cell, Dataset};

/// Add (or replace) `target` with the label that `mapping` assigns to each
/// row's `source` value.
///
/// Lookups use the trimmed text of the source cell, so `" BOSTON MEDICAL
/// CENTER"` and `"BOSTON MEDICAL CENTER"` map alike.  Values without an entry
/// get `default`, or [`Cell::Missing`] when no default is given.
pub fn map_category(
    dataset: &Dataset,
    source: &str,
    target: &str,
    mapping: &BTreeMap<String, String>,
    default: Option<&str>,
) -> Dataset {
    let fallback = default.map_or(Cell::Missing, Cell::from);
    let mut unmapped = 0usize;
    let out = dataset.with_column(target, |row| {
        let label = cell(row, source)
            .as_text()
            .and_then(|raw| mapping.get(raw.trim()));
        match label {
            Some(label) => Cell::from(label.as_str()),
            None => {
                unmapped += 1;
                fallback.clone()
            }
        }
    });
    log::debug!(
        "mapped {source} → {target}: {} rows, {unmapped} without an entry",
        out.len()
    );
    out
}
