use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bulkedit_model::{ImportOptions, RecordId, Row};

use crate::error::{IngestError, Result};

/// Marker in the id column for a record that does not exist yet.
pub const NEW_RECORD_MARKER: &str = "+";

/// Turns one input format into batch rows.
pub trait RowLoader: Send + Sync {
    /// Content type this loader is registered under.
    fn content_type(&self) -> &'static str;

    /// Reads rows from `reader`. `source` names the input in errors.
    fn read(&self, reader: &mut dyn Read, source: &Path, options: &ImportOptions)
    -> Result<Vec<Row>>;

    fn load(&self, path: &Path, options: &ImportOptions) -> Result<Vec<Row>> {
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        self.read(&mut reader, path, options)
    }
}

/// Splits a multi-valued cell. Blank parts are dropped, so a blank cell
/// yields no values.
pub(crate) fn split_cell(raw: &str, separator: &str) -> Vec<String> {
    let parts: Vec<&str> = if separator.is_empty() {
        vec![raw]
    } else {
        raw.split(separator).collect()
    };
    parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses the id cell: blank or `+` means a new record.
pub(crate) fn parse_record_id(raw: &str, source: &Path, row: usize) -> Result<Option<RecordId>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NEW_RECORD_MARKER {
        return Ok(None);
    }
    RecordId::parse(trimmed)
        .map(Some)
        .map_err(|_| IngestError::InvalidRecordId {
            path: source.to_path_buf(),
            row,
            value: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_blank_parts() {
        assert_eq!(split_cell("a||b", "||"), vec!["a", "b"]);
        assert_eq!(split_cell("a|| ||b", "||"), vec!["a", "b"]);
        assert!(split_cell("", "||").is_empty());
        assert_eq!(split_cell("a||b", ""), vec!["a||b"]);
    }

    #[test]
    fn new_record_markers() {
        let path = Path::new("rows.csv");
        assert_eq!(parse_record_id("", path, 1).expect("blank"), None);
        assert_eq!(parse_record_id(" + ", path, 1).expect("plus"), None);
        assert!(matches!(
            parse_record_id("nope", path, 3),
            Err(IngestError::InvalidRecordId { row: 3, .. })
        ));
    }
}
