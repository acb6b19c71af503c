//! CSV row loader.
//!
//! The first line holds column keys. `id` and `action` are lifted onto the
//! row; every other cell is split on the value separator. An empty cell keeps
//! its column with no values, which asks for the field to be emptied.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use bulkedit_model::{ACTION_COLUMN, ID_COLUMN, ImportOptions, Row, RowNumber};

use crate::error::{IngestError, Result};
use crate::loader::{RowLoader, parse_record_id, split_cell};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRowLoader;

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

impl RowLoader for CsvRowLoader {
    fn content_type(&self) -> &'static str {
        CSV_CONTENT_TYPE
    }

    fn read(
        &self,
        reader: &mut dyn Read,
        source: &Path,
        options: &ImportOptions,
    ) -> Result<Vec<Row>> {
        let csv_error = |error: csv::Error| IngestError::Csv {
            path: source.to_path_buf(),
            source: error,
        };
        let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = csv
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(normalize_header)
            .collect();
        let mut seen = BTreeSet::new();
        for header in &headers {
            if !header.is_empty() && !seen.insert(header.as_str()) {
                return Err(IngestError::DuplicateColumn {
                    path: source.to_path_buf(),
                    column: header.clone(),
                });
            }
        }

        let mut rows = Vec::new();
        let mut number = RowNumber::FIRST;
        for record in csv.records() {
            let record = record.map_err(csv_error)?;
            let mut row = Row::new(number);
            for (header, cell) in headers.iter().zip(record.iter()) {
                match header.as_str() {
                    "" => {}
                    ID_COLUMN => row.id = parse_record_id(cell, source, number.get())?,
                    ACTION_COLUMN => row.action = cell.trim().to_string(),
                    key => {
                        row.values.insert(
                            key.to_string(),
                            split_cell(cell, &options.value_separator),
                        );
                    }
                }
            }
            rows.push(row);
            number = number.next();
        }
        debug!(path = %source.display(), rows = rows.len(), columns = headers.len(), "csv rows loaded");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use bulkedit_model::RecordId;

    use super::*;

    fn read(text: &str) -> Result<Vec<Row>> {
        CsvRowLoader.read(
            &mut text.as_bytes(),
            Path::new("batch.csv"),
            &ImportOptions::default(),
        )
    }

    #[test]
    fn lifts_id_and_action() {
        let id = RecordId::new_v4();
        let text = format!("id,collection,action,dc.title\n{id},123/1,withdraw,Old\n+,123/1,,New\n");
        let rows = read(&text).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, Some(id));
        assert_eq!(rows[0].action, "withdraw");
        assert!(rows[1].is_new());
        assert_eq!(rows[1].number.get(), 2);
        assert!(!rows[1].values.contains_key("id"));
    }

    #[test]
    fn splits_multi_valued_cells() {
        let rows = read("id,dc.subject,dc.title\n,a||b,\n").expect("rows");
        assert_eq!(rows[0].get("dc.subject"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(rows[0].get("dc.title"), Some(&[][..]));
    }

    #[test]
    fn strips_byte_order_mark() {
        let rows = read("\u{feff}id,dc.title\n,A\n").expect("rows");
        assert!(rows[0].is_new());
        assert_eq!(rows[0].first("dc.title"), Some("A"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = read("id,dc.title,dc.title\n,a,b\n").expect_err("duplicate");
        assert!(matches!(err, IngestError::DuplicateColumn { column, .. } if column == "dc.title"));
    }
}
