//! JSON row loader.
//!
//! The input is an array of objects:
//!
//! ```json
//! [{"id": "+", "action": "", "values": {"dc.title": "A", "dc.subject": ["x", "y"]}}]
//! ```
//!
//! A string cell is split on the value separator like a CSV cell; an array
//! cell is taken as is.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use bulkedit_model::{ImportOptions, Row, RowNumber};

use crate::error::{IngestError, Result};
use crate::loader::{RowLoader, parse_record_id, split_cell};

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Cell {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    values: BTreeMap<String, Cell>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRowLoader;

impl RowLoader for JsonRowLoader {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn read(
        &self,
        reader: &mut dyn Read,
        source: &Path,
        options: &ImportOptions,
    ) -> Result<Vec<Row>> {
        let parsed: Vec<JsonRow> =
            serde_json::from_reader(reader).map_err(|error| IngestError::Json {
                path: source.to_path_buf(),
                source: error,
            })?;
        let mut rows = Vec::with_capacity(parsed.len());
        let mut number = RowNumber::FIRST;
        for entry in parsed {
            let mut row = Row::new(number).with_action(entry.action.trim());
            row.id = parse_record_id(&entry.id, source, number.get())?;
            for (key, cell) in entry.values {
                let values = match cell {
                    Cell::Single(raw) => split_cell(&raw, &options.value_separator),
                    Cell::Multiple(values) => values,
                };
                row.values.insert(key.trim().to_string(), values);
            }
            rows.push(row);
            number = number.next();
        }
        debug!(path = %source.display(), rows = rows.len(), "json rows loaded");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_and_multiple_cells() {
        let text = r#"[
            {"id": "+", "values": {"dc.title": "A", "dc.subject": ["x", "y"], "collection": "c1||c2"}},
            {"values": {"dc.title": ""}}
        ]"#;
        let rows = JsonRowLoader
            .read(&mut text.as_bytes(), Path::new("rows.json"), &ImportOptions::default())
            .expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_new());
        assert_eq!(rows[0].get("dc.subject").map(<[String]>::len), Some(2));
        assert_eq!(rows[0].collections().map(<[String]>::len), Some(2));
        assert_eq!(rows[1].number.get(), 2);
        assert_eq!(rows[1].get("dc.title").map(<[String]>::len), Some(0));
    }

    #[test]
    fn malformed_json_names_the_source() {
        let err = JsonRowLoader
            .read(&mut "{".as_bytes(), Path::new("rows.json"), &ImportOptions::default())
            .expect_err("malformed");
        assert!(err.to_string().starts_with("failed to parse JSON rows.json"));
    }
}
