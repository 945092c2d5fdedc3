use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing datasets.
///
/// Coercion problems are not errors: unparsable cells become
/// [`Cell::Missing`](crate::data::model::Cell::Missing).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{}: missing header row", .path.display())]
    MissingHeader { path: PathBuf },

    #[error("{}: column '{name}' appears more than once in the header", .path.display())]
    DuplicateColumn { path: PathBuf, name: String },

    #[error("{}, line {line}: expected {expected} fields, found {found}", .path.display())]
    MalformedInput {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{}: unreadable CSV: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown color '{0}' (expected a CSS color name or #rrggbb)")]
    UnknownColor(String),

    #[error("config must select at least one {0}")]
    Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}
