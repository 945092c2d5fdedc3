use std::cmp::Ordering;

use super::model::{cell, Cell, Dataset, Row};

/// Group rows by the cell in `column`, keeping groups in first-encounter order
/// and rows in input order within each group.
fn groups<'a>(dataset: &'a Dataset, column: &str) -> Vec<(Cell, Vec<&'a Row>)> {
    let mut out: Vec<(Cell, Vec<&Row>)> = Vec::new();
    for row in &dataset.rows {
        let key = cell(row, column);
        match out.iter().position(|(k, _)| k == key) {
            Some(i) => out[i].1.push(row),
            None => out.push((key.clone(), vec![row])),
        }
    }
    out
}

/// Descending by value, missing values last.
fn descending(a: &Row, b: &Row, value: &str) -> Ordering {
    match (cell(a, value).as_f64(), cell(b, value).as_f64()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order rows by `value` descending within each `group`, emitting groups in
/// the order they are first encountered.
///
/// The sort is stable: ties keep their input order, which downstream
/// rendering relies on.
pub fn sort_within_groups(dataset: &Dataset, group: &str, value: &str) -> Dataset {
    let rows = groups(dataset, group)
        .into_iter()
        .flat_map(|(_, mut rows)| {
            rows.sort_by(|a, b| descending(a, b, value));
            rows
        })
        .cloned()
        .collect();
    dataset.with_rows(rows)
}

/// Sort within groups (see [`sort_within_groups`]) and add `rank_column`
/// holding 1 for the highest value of each group, 2 for the next, and so on.
/// Rows whose value is missing get no rank.
pub fn rank_within_groups(dataset: &Dataset, group: &str, value: &str, rank_column: &str) -> Dataset {
    let sorted = sort_within_groups(dataset, group, value);
    let mut current: Option<Cell> = None;
    let mut next_rank = 0u32;
    sorted.with_column(rank_column, |row| {
        let key = cell(row, group);
        if current.as_ref() != Some(key) {
            current = Some(key.clone());
            next_rank = 0;
        }
        if cell(row, value).as_f64().is_none() {
            return Cell::Missing;
        }
        next_rank += 1;
        Cell::Number(f64::from(next_rank))
    })
}

/// Largest numeric value in a column, ignoring missing and text cells.
pub fn column_max(dataset: &Dataset, column: &str) -> Option<f64> {
    dataset
        .rows
        .iter()
        .filter_map(|row| cell(row, column).as_f64())
        .max_by(|a, b| a.total_cmp(b))
}

/// Largest value of `column` per `group`, groups in first-encounter order.
pub fn group_max(dataset: &Dataset, group: &str, column: &str) -> Vec<(Cell, Option<f64>)> {
    groups(dataset, group)
        .into_iter()
        .map(|(key, rows)| {
            let max = rows
                .iter()
                .filter_map(|row| cell(row, column).as_f64())
                .max_by(|a, b| a.total_cmp(b));
            (key, max)
        })
        .collect()
}

/// Split a dataset into one part per requested value of `column`, in the
/// requested order.  Values with no rows yield empty parts.
pub fn partition(dataset: &Dataset, column: &str, order: &[String]) -> Vec<(String, Dataset)> {
    order
        .iter()
        .map(|wanted| {
            let rows = dataset
                .rows
                .iter()
                .filter(|row| cell(row, column).as_text() == Some(wanted.as_str()))
                .cloned()
                .collect();
            (wanted.clone(), dataset.with_rows(rows))
        })
        .collect()
}
