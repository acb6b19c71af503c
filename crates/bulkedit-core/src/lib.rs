//! Batch engine core: collaborator contracts, batch-local state, reference
//! resolution and change computation.

pub mod catalog;
pub mod changes;
pub mod context;
pub mod graph;
pub mod index;
pub mod memory;
pub mod resolver;
pub mod scan;
pub mod store;

pub use catalog::StaticCatalog;
pub use changes::{ChangeComputer, DesiredField, ResolvedRelations, clean, normalized_eq};
pub use context::BatchContext;
pub use graph::RelationGraph;
pub use index::ReferenceIndex;
pub use memory::{MemoryContainer, MemoryRecord, MemoryStore, StoreSnapshot};
pub use resolver::{ReferenceResolver, evaluate_record_id};
pub use scan::{ScannedBatch, scan};
pub use store::{
    ContainerStore, RecordStore, RelationshipTypeCatalog, Repository, StoreResult,
    StoredRecord, StoredRelationship, SubmissionState,
};
