use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::{COLLECTION_COLUMN, ColumnKey};
use crate::{RecordId, RowNumber};

/// One input row of a batch.
///
/// `values` maps a column key to its ordered values. A key that is present
/// with no values means "this field should be empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub number: RowNumber,
    pub id: Option<RecordId>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub values: BTreeMap<String, Vec<String>>,
}

impl Row {
    pub fn new(number: RowNumber) -> Self {
        Self {
            number,
            id: None,
            action: String::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_values<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_values(key, [value.into()])
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn collections(&self) -> Option<&[String]> {
        self.get(COLLECTION_COLUMN)
    }

    pub fn row_name(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| ColumnKey::parse(key) == ColumnKey::RowName)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    /// First value of the entity-type column, with stray quotes removed.
    pub fn entity_type(&self) -> Option<String> {
        self.values
            .iter()
            .filter(|(key, _)| {
                ColumnKey::parse(key)
                    .field()
                    .is_some_and(crate::FieldKey::is_entity_type)
            })
            .find_map(|(_, values)| values.first())
            .map(|value| value.replace('"', "").trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_ignores_language_suffix_and_quotes() {
        let row = Row::new(RowNumber::FIRST).with_value("dspace.entity.type[]", "\"Person\" ");
        assert_eq!(row.entity_type().as_deref(), Some("Person"));
    }

    #[test]
    fn row_name_is_case_insensitive() {
        let row = Row::new(RowNumber::FIRST).with_value("ROWNAME", "paper-a");
        assert_eq!(row.row_name(), Some("paper-a"));
    }
}
