//! Metadata field keys and CSV column keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Column carrying the explicit record identifier.
pub const ID_COLUMN: &str = "id";
/// Column carrying container handles; the first one owns the record.
pub const COLLECTION_COLUMN: &str = "collection";
/// Column carrying the lifecycle action token.
pub const ACTION_COLUMN: &str = "action";
/// Column carrying the batch-local row name.
pub const ROW_NAME_COLUMN: &str = "rowName";

const RELATION_SCHEMA: &str = "relation";

/// Four-part metadata field key: `schema.element[.qualifier][[language]]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    schema: String,
    element: String,
    qualifier: Option<String>,
    language: Option<String>,
}

impl FieldKey {
    pub fn new(schema: impl Into<String>, element: impl Into<String>, qualifier: Option<&str>) -> Self {
        Self {
            schema: schema.into(),
            element: element.into(),
            qualifier: qualifier.map(str::to_string),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// The field holding a record's entity type (`dspace.entity.type`).
    pub fn entity_type() -> Self {
        Self::new("dspace", "entity", Some("type"))
    }

    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        let (dotted, language) = split_language(trimmed);
        let parts: Vec<&str> = dotted.split('.').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(ModelError::InvalidFieldKey {
                key: raw.to_string(),
                reason: "expected schema.element[.qualifier]".to_string(),
            });
        }
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(ModelError::InvalidFieldKey {
                key: raw.to_string(),
                reason: "empty field component".to_string(),
            });
        }
        Ok(Self {
            schema: parts[0].to_string(),
            element: parts[1].to_string(),
            qualifier: parts.get(2).map(|part| (*part).to_string()),
            language,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn is_relation(&self) -> bool {
        self.schema.eq_ignore_ascii_case(RELATION_SCHEMA)
    }

    pub fn is_entity_type(&self) -> bool {
        self.schema.eq_ignore_ascii_case("dspace")
            && self.element.eq_ignore_ascii_case("entity")
            && self
                .qualifier
                .as_deref()
                .is_some_and(|qualifier| qualifier.eq_ignore_ascii_case("type"))
    }

    /// `schema.element[.qualifier]`, without the language.
    pub fn dotted(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}.{}", self.schema, self.element, qualifier),
            None => format!("{}.{}", self.schema, self.element),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())?;
        if let Some(language) = &self.language {
            write!(f, "[{language}]")?;
        }
        Ok(())
    }
}

fn split_language(raw: &str) -> (&str, Option<String>) {
    if let Some(stripped) = raw.strip_suffix(']')
        && let Some(open) = stripped.find('[')
    {
        let language = stripped[open + 1..].trim();
        let language = (!language.is_empty()).then(|| language.to_string());
        return (&stripped[..open], language);
    }
    (raw, None)
}

/// Interpretation of a row's column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    Id,
    Collection,
    Action,
    RowName,
    /// A metadata column. `authority_source` is set for external authority
    /// feeds written as `SOURCE:schema.element[.qualifier]`.
    Metadata {
        field: FieldKey,
        authority_source: Option<String>,
    },
    Other(String),
}

impl ColumnKey {
    pub fn parse(raw: &str) -> Self {
        let key = raw.trim();
        if key == ID_COLUMN {
            return ColumnKey::Id;
        }
        if key == COLLECTION_COLUMN {
            return ColumnKey::Collection;
        }
        if key == ACTION_COLUMN {
            return ColumnKey::Action;
        }
        if key.eq_ignore_ascii_case(ROW_NAME_COLUMN) {
            return ColumnKey::RowName;
        }
        if !key.contains('.') {
            return ColumnKey::Other(key.to_string());
        }
        let (authority_source, field_part) = match key.split_once(':') {
            Some((source, rest)) => (Some(source.trim().to_string()), rest),
            None => (None, key),
        };
        match FieldKey::parse(field_part) {
            Ok(field) => ColumnKey::Metadata {
                field,
                authority_source,
            },
            Err(_) => ColumnKey::Other(key.to_string()),
        }
    }

    pub fn field(&self) -> Option<&FieldKey> {
        match self {
            ColumnKey::Metadata { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether `key:value` pairs of this column feed the batch reference index.
    pub fn is_indexable(&self) -> bool {
        match self {
            ColumnKey::RowName => true,
            ColumnKey::Metadata { field, .. } => !field.is_relation(),
            _ => false,
        }
    }

    pub fn is_relation(&self) -> bool {
        self.field().is_some_and(FieldKey::is_relation)
    }
}
