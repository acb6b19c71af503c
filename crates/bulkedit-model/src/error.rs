use std::fmt;

use thiserror::Error;

use crate::{ContainerId, Identifier, RecordId, RelationDiagnostic, RowNumber};

/// Errors raised while building model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid record id '{value}'")]
    InvalidRecordId { value: String },
    #[error("invalid field key '{key}': {reason}")]
    InvalidFieldKey { key: String, reason: String },
    #[error("malformed reference '{reference}': {reason}")]
    MalformedReference { reference: String, reason: String },
}

/// Failures reported by the persisted store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record {id} not found")]
    RecordNotFound { id: RecordId },
    #[error("container {id} not found")]
    ContainerNotFound { id: ContainerId },
    #[error("store failure: {message}")]
    Backend { message: String },
}

/// Where the competing candidates of an ambiguous reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguitySource {
    Store,
    Batch,
    StoreAndBatch,
}

impl fmt::Display for AmbiguitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AmbiguitySource::Store => "store",
            AmbiguitySource::Batch => "batch",
            AmbiguitySource::StoreAndBatch => "store and batch",
        })
    }
}

/// Errors of a bulk import run.
#[derive(Debug, Error)]
pub enum ImportError {
    // === Resolution ===
    #[error("row {row}: malformed reference '{reference}' in {field}: {reason}")]
    MalformedReference {
        row: RowNumber,
        field: String,
        reference: String,
        reason: String,
    },

    #[error("row {row}: ambiguous reference '{reference}' in {field}: multiple matches in {matches_in}")]
    AmbiguousReference {
        row: RowNumber,
        field: String,
        reference: String,
        matches_in: AmbiguitySource,
    },

    #[error(
        "row {row}: no matches found for reference '{reference}' in {field} \
         (only rows listed earlier in the batch can be referenced)"
    )]
    UnresolvedReference {
        row: RowNumber,
        field: String,
        reference: String,
    },

    // === Row content ===
    #[error("row {row}: {}", missing_container_message(.handle.as_deref()))]
    MissingContainer { row: RowNumber, handle: Option<String> },

    #[error("row {row}: duplicate container assignment '{handle}'")]
    DuplicateContainer { row: RowNumber, handle: String },

    #[error("row {row}: unknown action '{action}'")]
    UnknownAction { row: RowNumber, action: String },

    #[error("row {row}: action '{action}' not allowed: {reason}")]
    ActionNotAllowed {
        row: RowNumber,
        action: String,
        reason: String,
    },

    #[error("row {row}: unknown record id {id}")]
    UnknownRecord { row: RowNumber, id: RecordId },

    // === Validation ===
    #[error(
        "relationship validation failed with {} error(s):\n{}",
        .diagnostics.len(),
        render_diagnostics(.diagnostics)
    )]
    RelationshipTypeMismatch { diagnostics: Vec<RelationDiagnostic> },

    // === Apply ===
    #[error("row {row}: placeholder for row {placeholder} has no created record")]
    UnmappedPlaceholder { row: RowNumber, placeholder: RowNumber },

    #[error("row {row}: relation {relation_key} to {target} was not validated")]
    UnplannedRelation {
        row: RowNumber,
        relation_key: String,
        target: Identifier,
    },

    #[error("{}: persistence failure: {source}", row_label(.row))]
    Persistence {
        row: Option<RowNumber>,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    pub fn persistence(row: RowNumber, source: StoreError) -> Self {
        ImportError::Persistence {
            row: Some(row),
            source,
        }
    }

    /// Row the error refers to, when there is exactly one.
    pub fn row(&self) -> Option<RowNumber> {
        match self {
            ImportError::MalformedReference { row, .. }
            | ImportError::AmbiguousReference { row, .. }
            | ImportError::UnresolvedReference { row, .. }
            | ImportError::MissingContainer { row, .. }
            | ImportError::DuplicateContainer { row, .. }
            | ImportError::UnknownAction { row, .. }
            | ImportError::ActionNotAllowed { row, .. }
            | ImportError::UnknownRecord { row, .. }
            | ImportError::UnmappedPlaceholder { row, .. }
            | ImportError::UnplannedRelation { row, .. } => Some(*row),
            ImportError::Persistence { row, .. } => *row,
            ImportError::RelationshipTypeMismatch { .. } => None,
        }
    }
}

fn missing_container_message(handle: Option<&str>) -> String {
    match handle {
        Some(handle) => format!("'{handle}' is not a valid container"),
        None => "record must be assigned an owning container".to_string(),
    }
}

fn render_diagnostics(diagnostics: &[RelationDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| format!("- {diagnostic}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn row_label(row: &Option<RowNumber>) -> String {
    match row {
        Some(row) => format!("row {row}"),
        None => "commit".to_string(),
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
