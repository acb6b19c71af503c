//! Data model for batch metadata import.
//!
//! Rows describe records to create or modify. Relation columns reference other
//! records by id, by `rowName`, or by metadata value; the engine resolves those
//! references to [`Identifier`]s, diffs each row into a [`ChangeSet`], and
//! validates the [`RelationEdge`]s against declared [`RelationshipType`]s.

pub mod change;
pub mod error;
pub mod field;
pub mod ids;
pub mod operation;
pub mod options;
pub mod reference;
pub mod relation;
pub mod row;

pub use change::{ChangeSet, ContainerChanges, LifecycleAction};
pub use error::{AmbiguitySource, ImportError, ModelError, Result, StoreError};
pub use field::{
    ACTION_COLUMN, COLLECTION_COLUMN, ColumnKey, FieldKey, ID_COLUMN, ROW_NAME_COLUMN,
};
pub use ids::{ContainerId, Identifier, RecordId, RowNumber};
pub use operation::{
    CONFIDENCE_ACCEPTED, CONFIDENCE_UNSET, MetadataOperation, MetadataValue, OperationKind,
};
pub use options::{DEFAULT_CHECKPOINT_SIZE, ImportOptions, PolicyFlags};
pub use reference::{ROW_NAME_PREFIX, Reference, VIRTUAL_MARKER};
pub use relation::{
    RelationDiagnostic, RelationDirection, RelationEdge, RelationshipType, relation_base_name,
};
pub use row::Row;
