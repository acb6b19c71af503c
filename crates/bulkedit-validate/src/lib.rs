//! Validation of the relationship graph a batch expresses.

pub mod plan;
pub mod validator;

pub use plan::{PlannedRelation, RelationPlan, RelationReport};
pub use validator::{RelationValidator, ValidatedBatch, validate};
