//! Parsing of reference strings found in relation columns.
//!
//! ```text
//! reference := persisted-id
//!            | persisted-id "::virtual::" suffix
//!            | "rowName:" literal-value
//!            | schema "." element ["." qualifier] ":" literal-value
//! ```

use crate::{FieldKey, ModelError, RecordId};

pub const VIRTUAL_MARKER: &str = "::virtual::";
pub const ROW_NAME_PREFIX: &str = "rowName:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// A literal persisted id.
    Direct(RecordId),
    /// A persisted id followed by a virtual-metadata suffix; passed through
    /// without any lookup.
    Virtual { id: RecordId, suffix: String },
    /// `rowName:VALUE`, answered by the batch index only.
    RowName(String),
    /// `schema.element[.qualifier]:VALUE`, answered by the store and the
    /// batch index.
    FieldValue { field: FieldKey, value: String },
}

impl Reference {
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        if !raw.contains(':') {
            return RecordId::parse(raw)
                .map(Reference::Direct)
                .map_err(|_| malformed(raw, "not a record id or indirect reference"));
        }
        if let Some((id, suffix)) = raw.split_once(VIRTUAL_MARKER) {
            let id = RecordId::parse(id)
                .map_err(|_| malformed(raw, "virtual reference does not start with a record id"))?;
            return Ok(Reference::Virtual {
                id,
                suffix: suffix.to_string(),
            });
        }
        if let Some(value) = raw.strip_prefix(ROW_NAME_PREFIX) {
            return Ok(Reference::RowName(value.to_string()));
        }
        let (field, value) = raw
            .split_once(':')
            .ok_or_else(|| malformed(raw, "missing ':' separator"))?;
        let field = FieldKey::parse(field).map_err(|_| {
            malformed(
                raw,
                "bad metadata field (expected syntax is schema.element[.qualifier])",
            )
        })?;
        Ok(Reference::FieldValue {
            field,
            value: value.to_string(),
        })
    }

    /// Whether the batch index is consulted for this reference.
    pub fn uses_batch_index(&self) -> bool {
        !matches!(self, Reference::Virtual { .. })
    }
}

fn malformed(raw: &str, reason: &str) -> ModelError {
    ModelError::MalformedReference {
        reference: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_form() {
        let id = RecordId::new_v4();
        assert_eq!(
            Reference::parse(&id.to_string()).expect("direct"),
            Reference::Direct(id)
        );
        assert_eq!(
            Reference::parse(&format!("{id}::virtual::4::600")).expect("virtual"),
            Reference::Virtual {
                id,
                suffix: "4::600".to_string()
            }
        );
        assert_eq!(
            Reference::parse("rowName:paper-a").expect("row name"),
            Reference::RowName("paper-a".to_string())
        );
        match Reference::parse("dc.title:Paper: A Study").expect("field value") {
            Reference::FieldValue { field, value } => {
                assert_eq!(field.dotted(), "dc.title");
                assert_eq!(value, "Paper: A Study");
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed() {
        assert!(Reference::parse("12345").is_err());
        assert!(Reference::parse("title:Paper").is_err());
        assert!(Reference::parse("nope::virtual::1").is_err());
    }
}
