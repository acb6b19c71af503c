//! Contracts of the collaborators the engine talks to.
//!
//! The engine never owns persisted state. It reads and mutates records,
//! containers and relationships through these traits, and the caller decides
//! which backend sits behind them ([`crate::MemoryStore`] in tests and in the
//! CLI).

use serde::{Deserialize, Serialize};

use bulkedit_model::{
    ContainerId, FieldKey, MetadataValue, RecordId, RelationDirection, RelationshipType,
    StoreError,
};

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Submission state of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    InProgress,
    InWorkflow,
    Archived,
}

/// Summary of a persisted record as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub entity_type: Option<String>,
    pub owning_container: Option<ContainerId>,
    /// Containers the record is mapped into, excluding the owner.
    pub mapped_containers: Vec<ContainerId>,
    pub withdrawn: bool,
    pub state: SubmissionState,
}

/// A persisted relationship between two records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRelationship {
    pub type_id: u32,
    pub left: RecordId,
    pub right: RecordId,
}

impl StoredRelationship {
    /// Builds the relationship between `origin` and `target` for a type whose
    /// orientation has already been checked.
    pub fn oriented(
        type_id: u32,
        origin: RecordId,
        target: RecordId,
        direction: RelationDirection,
    ) -> Self {
        match direction {
            RelationDirection::OriginIsLeft => Self {
                type_id,
                left: origin,
                right: target,
            },
            RelationDirection::OriginIsRight => Self {
                type_id,
                left: target,
                right: origin,
            },
        }
    }

    pub fn involves(&self, id: RecordId) -> bool {
        self.left == id || self.right == id
    }
}

/// Record persistence.
///
/// Mutations are staged until [`RecordStore::commit`]; [`RecordStore::abort`]
/// discards everything staged since the previous commit.
pub trait RecordStore {
    fn find(&self, id: RecordId) -> StoreResult<Option<StoredRecord>>;

    /// Records holding `value` in `field`, any language.
    fn find_by_field_value(&self, field: &FieldKey, value: &str) -> StoreResult<Vec<RecordId>>;

    /// Current values of `field` (exact language match).
    fn metadata(&self, id: RecordId, field: &FieldKey) -> StoreResult<Vec<MetadataValue>>;

    fn create(&mut self, owning: ContainerId, use_template: bool) -> StoreResult<RecordId>;

    fn delete(&mut self, id: RecordId) -> StoreResult<()>;

    fn set_withdrawn(&mut self, id: RecordId, withdrawn: bool) -> StoreResult<()>;

    fn add_metadata(&mut self, id: RecordId, value: &MetadataValue) -> StoreResult<()>;

    /// Removes every value of `field` (exact language match); returns how many.
    fn clear_metadata(&mut self, id: RecordId, field: &FieldKey) -> StoreResult<usize>;

    fn relationships(&self, id: RecordId) -> StoreResult<Vec<StoredRelationship>>;

    fn add_relationship(&mut self, relationship: StoredRelationship) -> StoreResult<()>;

    /// Removes relationships of `type_id` in which `id` sits on the side
    /// given by `direction`; returns how many.
    fn clear_relationships(
        &mut self,
        id: RecordId,
        type_id: u32,
        direction: RelationDirection,
    ) -> StoreResult<usize>;

    fn start_workflow(&mut self, id: RecordId, notify: bool) -> StoreResult<()>;

    fn archive(&mut self, id: RecordId) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn abort(&mut self) -> StoreResult<()>;

    /// Drops records from any identity cache kept by the store.
    fn evict(&mut self, ids: &[RecordId]);
}

/// Container (collection) persistence.
pub trait ContainerStore {
    fn resolve_container(&self, handle: &str) -> StoreResult<Option<ContainerId>>;

    fn add_member(&mut self, container: ContainerId, record: RecordId) -> StoreResult<()>;

    fn remove_member(&mut self, container: ContainerId, record: RecordId) -> StoreResult<()>;

    fn set_owner(&mut self, record: RecordId, container: ContainerId) -> StoreResult<()>;
}

/// Both store contracts at once.
pub trait Repository: RecordStore + ContainerStore {}

impl<T: RecordStore + ContainerStore + ?Sized> Repository for T {}

/// Lookup of declared relationship types.
pub trait RelationshipTypeCatalog {
    /// Types whose leftward or rightward role name equals `name`.
    fn find_by_role_name(&self, name: &str) -> Vec<&RelationshipType>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_places_origin_on_declared_side() {
        let origin = RecordId::new_v4();
        let target = RecordId::new_v4();
        let left = StoredRelationship::oriented(1, origin, target, RelationDirection::OriginIsLeft);
        assert_eq!((left.left, left.right), (origin, target));
        let right = StoredRelationship::oriented(1, origin, target, RelationDirection::OriginIsRight);
        assert_eq!((right.left, right.right), (target, origin));
        assert!(right.involves(origin));
    }
}
