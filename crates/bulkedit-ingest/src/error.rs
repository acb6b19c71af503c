//! Error types for loading batch input.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading rows, catalogs or store snapshots.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: row {row}: invalid record id '{value}'")]
    InvalidRecordId {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{path}: duplicate column '{column}'")]
    DuplicateColumn { path: PathBuf, column: String },

    #[error("no row loader registered for content type '{content_type}'")]
    UnsupportedContentType { content_type: String },

    #[error("cannot infer content type of {path}")]
    UnknownExtension { path: PathBuf },
}

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;
