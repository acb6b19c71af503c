//! Batch-local lookup tables filled as rows are scanned.

use std::collections::{BTreeMap, BTreeSet};

use bulkedit_model::{ColumnKey, Identifier, ROW_NAME_COLUMN, Row, RowNumber};

/// Lookup tables over the rows scanned so far.
///
/// - `key:value` of every indexable column to the rows carrying it
/// - row number to the row's identifier
/// - identifier to the first value of the row's entity-type column
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    by_reference: BTreeMap<String, BTreeSet<RowNumber>>,
    identifiers: BTreeMap<RowNumber, Identifier>,
    entity_types: BTreeMap<Identifier, String>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `row` under `identifier`.
    pub fn index_row(&mut self, row: &Row, identifier: Identifier) {
        for (key, values) in &row.values {
            let column = ColumnKey::parse(key);
            if !column.is_indexable() {
                continue;
            }
            let key = match column {
                ColumnKey::RowName => ROW_NAME_COLUMN,
                _ => key.trim(),
            };
            for value in values.iter().map(String::as_str).map(str::trim) {
                if value.is_empty() {
                    continue;
                }
                self.by_reference
                    .entry(format!("{key}:{value}"))
                    .or_default()
                    .insert(row.number);
            }
        }
        if let Some(entity_type) = row.entity_type() {
            self.entity_types.insert(identifier, entity_type);
        }
        self.identifiers.insert(row.number, identifier);
    }

    /// Identifiers of the rows matching a full `key:value` reference.
    pub fn lookup(&self, reference: &str) -> BTreeSet<Identifier> {
        self.by_reference
            .get(reference)
            .into_iter()
            .flatten()
            .filter_map(|row| self.identifiers.get(row).copied())
            .collect()
    }

    pub fn identifier(&self, row: RowNumber) -> Option<Identifier> {
        self.identifiers.get(&row).copied()
    }

    /// First row scanned under `identifier`.
    pub fn row_of(&self, identifier: Identifier) -> Option<RowNumber> {
        if let Identifier::Placeholder(row) = identifier {
            return Some(row);
        }
        self.identifiers
            .iter()
            .find(|(_, candidate)| **candidate == identifier)
            .map(|(row, _)| *row)
    }

    pub fn entity_type(&self, identifier: Identifier) -> Option<&str> {
        self.entity_types.get(&identifier).map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.identifiers.len()
    }
}
