use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use csv::{ErrorKind, ReaderBuilder, StringRecord, WriterBuilder};

use super::model::{Cell, Dataset, Row};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load a dataset from a comma-separated file with a header row.
///
/// Every non-empty field loads as [`Cell::Text`]; empty fields load as
/// [`Cell::Missing`].  Type coercion is left to the filter stage so each
/// column can get its own policy.
///
/// Fails with [`DataError::MissingHeader`] on an empty file,
/// [`DataError::DuplicateColumn`] when a header name repeats, and
/// [`DataError::MalformedInput`] when a row's field count differs from the
/// header's.  No partial dataset is ever returned.
pub fn load_csv(path: &Path) -> Result<Dataset, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_csv(file, path)?;
    log::info!("loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Parse CSV text from any reader.  `path` only labels errors.
pub fn read_csv<R: io::Read>(reader: R, path: &Path) -> Result<Dataset, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(e, path))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if columns.is_empty() {
        return Err(DataError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut seen = BTreeSet::new();
    if let Some(name) = columns.iter().find(|c| !seen.insert(*c)) {
        return Err(DataError::DuplicateColumn {
            path: path.to_path_buf(),
            name: name.clone(),
        });
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(e, path))?;
        rows.push(record_to_row(&columns, &record));
    }

    Ok(Dataset::new(columns, rows))
}

fn record_to_row(columns: &[String], record: &StringRecord) -> Row {
    columns
        .iter()
        .zip(record.iter())
        .map(|(col, value)| (col.clone(), Cell::from(value)))
        .collect()
}

fn csv_error(err: csv::Error, path: &Path) -> DataError {
    if let ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = err.kind()
    {
        return DataError::MalformedInput {
            path: path.to_path_buf(),
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    DataError::Csv {
        path: path.to_path_buf(),
        source: err,
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a dataset as header-plus-rows CSV, replacing any existing file.
/// Parent directories are created as needed.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<(), DataError> {
    let io_err = |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    write_csv_to(dataset, file, path)?;
    log::info!("wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Serialize a dataset to any writer.  `path` only labels errors.
pub fn write_csv_to<W: io::Write>(dataset: &Dataset, writer: W, path: &Path) -> Result<(), DataError> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer
        .write_record(&dataset.columns)
        .map_err(|e| csv_error(e, path))?;
    for row in &dataset.rows {
        let fields: Vec<String> = dataset
            .columns
            .iter()
            .map(|col| row.get(col).map(Cell::to_field).unwrap_or_default())
            .collect();
        writer.write_record(&fields).map_err(|e| csv_error(e, path))?;
    }
    writer.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{coerce, CoercionRule};
    use crate::data::model::cell;

    const SPENDING: &str = "\
Facility ID,Facility Name,State,Score
010001,SOUTHEAST HEALTH MEDICAL CENTER,AL,0.98
220031,BOSTON MEDICAL CENTER,MA,Not Available
330101,,NY,1.02
";

    fn label() -> &'static Path {
        Path::new("spending.csv")
    }

    #[test]
    fn loads_everything_as_text() {
        let ds = read_csv(SPENDING.as_bytes(), label()).unwrap();
        assert_eq!(ds.columns, vec!["Facility ID", "Facility Name", "State", "Score"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(cell(&ds.rows[0], "Facility ID"), &Cell::Text("010001".into()));
        assert_eq!(cell(&ds.rows[0], "Score"), &Cell::Text("0.98".into()));
        assert!(cell(&ds.rows[2], "Facility Name").is_missing());
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = read_csv("".as_bytes(), label()).unwrap_err();
        assert!(matches!(err, DataError::MissingHeader { .. }));
    }

    #[test]
    fn repeated_header_name_is_rejected() {
        let err = read_csv("A,A\n1,2\n".as_bytes(), label()).unwrap_err();
        match err {
            DataError::DuplicateColumn { name, .. } => assert_eq!(name, "A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_is_an_empty_dataset() {
        let ds = read_csv("Facility ID,Score\n".as_bytes(), label()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.columns.len(), 2);
    }

    #[test]
    fn short_row_is_malformed() {
        let text = "Facility ID,State,Score\n010001,AL,0.98\n220031,MA\n";
        let err = read_csv(text.as_bytes(), label()).unwrap_err();
        match err {
            DataError::MalformedInput {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_error_names_the_file() {
        let text = "a,b\n1,2,3\n";
        let err = read_csv(text.as_bytes(), Path::new("payments.csv")).unwrap_err();
        assert!(err.to_string().contains("payments.csv"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn write_then_reload_round_trips() {
        let raw = read_csv(SPENDING.as_bytes(), label()).unwrap();
        let rules = [CoercionRule::decimal("Score")];
        let typed = coerce(&raw, &rules);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("spending_out.csv");
        write_csv(&typed, &path).unwrap();

        let reloaded = coerce(&load_csv(&path).unwrap(), &rules);
        assert_eq!(reloaded, typed);
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let ds = read_csv(SPENDING.as_bytes(), label()).unwrap();
        write_csv(&ds, &path).unwrap();
        write_csv(&ds.empty_like(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Facility ID,Facility Name,State,Score\n");
    }

    #[test]
    fn quoted_fields_survive_writing() {
        let text = "Facility Name,Payment\n\"MOUNT SINAI, NY\",\"$1,234.50\"\n";
        let ds = read_csv(text.as_bytes(), label()).unwrap();
        let mut out = Vec::new();
        write_csv_to(&ds, &mut out, label()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }
}
