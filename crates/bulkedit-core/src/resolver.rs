//! Resolution of relation references to batch identifiers.

use tracing::trace;

use bulkedit_model::{
    AmbiguitySource, Identifier, ImportError, ModelError, Reference, Result, Row, RowNumber,
};

use crate::index::ReferenceIndex;
use crate::store::RecordStore;

/// Identifier of a row: its explicit id, or a placeholder for its row number.
pub fn evaluate_record_id(row: &Row) -> Identifier {
    match row.id {
        Some(id) => Identifier::Persisted(id),
        None => Identifier::Placeholder(row.number),
    }
}

/// Resolves reference strings against the store and the rows scanned so far.
///
/// Only rows listed before the current one are visible, since the index is
/// filled after each row is scanned.
pub struct ReferenceResolver<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    index: &'a ReferenceIndex,
}

impl<'a, S: RecordStore + ?Sized> ReferenceResolver<'a, S> {
    pub fn new(store: &'a S, index: &'a ReferenceIndex) -> Self {
        Self { store, index }
    }

    /// Resolves `raw`, found in column `field` of `row`, to exactly one
    /// identifier.
    pub fn resolve(&self, row: RowNumber, field: &str, raw: &str) -> Result<Identifier> {
        let reference = Reference::parse(raw).map_err(|err| {
            let reason = match err {
                ModelError::MalformedReference { reason, .. } => reason,
                other => other.to_string(),
            };
            ImportError::MalformedReference {
                row,
                field: field.to_string(),
                reference: raw.to_string(),
                reason,
            }
        })?;

        let from_store = match &reference {
            Reference::Direct(id) | Reference::Virtual { id, .. } => Some(Identifier::Persisted(*id)),
            Reference::RowName(_) => None,
            Reference::FieldValue { field: key, value } => {
                let matches = self
                    .store
                    .find_by_field_value(key, value)
                    .map_err(|source| ImportError::persistence(row, source))?;
                match matches.as_slice() {
                    [] => None,
                    [id] => Some(Identifier::Persisted(*id)),
                    _ => return Err(ambiguous(row, field, raw, AmbiguitySource::Store)),
                }
            }
        };

        if !reference.uses_batch_index()
            && let Some(stored) = from_store
        {
            return Ok(stored);
        }

        let from_batch = self.index.lookup(raw);
        trace!(%row, reference = raw, store = ?from_store, batch = from_batch.len(), "reference lookup");

        let mut batch = from_batch.into_iter();
        match (batch.next(), batch.next()) {
            (None, _) => from_store.ok_or_else(|| ImportError::UnresolvedReference {
                row,
                field: field.to_string(),
                reference: raw.to_string(),
            }),
            (Some(_), Some(_)) => Err(ambiguous(row, field, raw, AmbiguitySource::Batch)),
            (Some(found), None) => match from_store {
                Some(stored) if stored != found => {
                    Err(ambiguous(row, field, raw, AmbiguitySource::StoreAndBatch))
                }
                _ => Ok(found),
            },
        }
    }
}

fn ambiguous(row: RowNumber, field: &str, raw: &str, source: AmbiguitySource) -> ImportError {
    ImportError::AmbiguousReference {
        row,
        field: field.to_string(),
        reference: raw.to_string(),
        matches_in: source,
    }
}
