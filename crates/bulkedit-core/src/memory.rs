//! In-memory store with staged and committed state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bulkedit_model::{
    ContainerId, FieldKey, MetadataValue, RecordId, RelationDirection, StoreError,
};

use crate::store::{
    ContainerStore, RecordStore, StoreResult, StoredRecord, StoredRelationship, SubmissionState,
};

/// A container as held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryContainer {
    pub id: ContainerId,
    pub handle: String,
    #[serde(default)]
    pub name: String,
    /// Metadata copied onto records created from this container's template.
    #[serde(default)]
    pub template: Vec<MetadataValue>,
}

/// A record as held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: RecordId,
    #[serde(default)]
    pub owning_container: Option<ContainerId>,
    #[serde(default)]
    pub mapped_containers: Vec<ContainerId>,
    #[serde(default)]
    pub withdrawn: bool,
    #[serde(default)]
    pub state: SubmissionState,
    #[serde(default)]
    pub metadata: Vec<MetadataValue>,
}

impl MemoryRecord {
    pub fn new(owning: ContainerId) -> Self {
        Self {
            id: RecordId::new_v4(),
            owning_container: Some(owning),
            mapped_containers: Vec::new(),
            withdrawn: false,
            state: SubmissionState::Archived,
            metadata: Vec::new(),
        }
    }

    pub fn with_value(mut self, field: FieldKey, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataValue::plain(field, value));
        self
    }

    pub fn with_metadata(mut self, value: MetadataValue) -> Self {
        self.metadata.push(value);
        self
    }

    pub fn with_entity_type(self, entity_type: &str) -> Self {
        self.with_value(FieldKey::entity_type(), entity_type)
    }

    pub fn with_mapped(mut self, container: ContainerId) -> Self {
        self.mapped_containers.push(container);
        self
    }

    pub fn withdrawn(mut self) -> Self {
        self.withdrawn = true;
        self
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|value| value.field.is_entity_type())
            .map(|value| value.value.as_str())
    }

    pub fn values(&self, field: &FieldKey) -> impl Iterator<Item = &MetadataValue> {
        self.metadata.iter().filter(move |value| &value.field == field)
    }

    fn summary(&self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            entity_type: self.entity_type().map(str::to_string),
            owning_container: self.owning_container,
            mapped_containers: self.mapped_containers.clone(),
            withdrawn: self.withdrawn,
            state: self.state,
        }
    }
}

/// Serializable state of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub containers: Vec<MemoryContainer>,
    #[serde(default)]
    pub records: Vec<MemoryRecord>,
    #[serde(default)]
    pub relationships: Vec<StoredRelationship>,
}

impl StoreSnapshot {
    pub fn record(&self, id: RecordId) -> Option<&MemoryRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn container_by_handle(&self, handle: &str) -> Option<&MemoryContainer> {
        self.containers
            .iter()
            .find(|container| container.handle == handle.trim())
    }

    fn record_mut(&mut self, id: RecordId) -> StoreResult<&mut MemoryRecord> {
        self.records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::RecordNotFound { id })
    }

    fn container(&self, id: ContainerId) -> StoreResult<&MemoryContainer> {
        self.containers
            .iter()
            .find(|container| container.id == id)
            .ok_or(StoreError::ContainerNotFound { id })
    }
}

/// Store backed by two snapshots: what has been committed and what the
/// current transaction sees.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: StoreSnapshot,
    staged: StoreSnapshot,
    commits: usize,
    cached: BTreeSet<RecordId>,
    evicted: Vec<RecordId>,
    creates: usize,
    fail_on_create: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            committed: snapshot.clone(),
            staged: snapshot,
            ..Self::default()
        }
    }

    /// Makes the `n`-th call to [`RecordStore::create`] fail (1-based).
    pub fn with_failing_create(mut self, n: usize) -> Self {
        self.fail_on_create = Some(n);
        self
    }

    /// Committed state.
    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.committed
    }

    /// State visible to the running transaction.
    pub fn staged(&self) -> &StoreSnapshot {
        &self.staged
    }

    pub fn add_container(&mut self, handle: &str, name: &str) -> ContainerId {
        let container = MemoryContainer {
            id: ContainerId::new_v4(),
            handle: handle.to_string(),
            name: name.to_string(),
            template: Vec::new(),
        };
        let id = container.id;
        self.committed.containers.push(container.clone());
        self.staged.containers.push(container);
        id
    }

    /// Inserts a record directly into committed state.
    pub fn seed_record(&mut self, record: MemoryRecord) -> RecordId {
        let id = record.id;
        self.committed.records.push(record.clone());
        self.staged.records.push(record);
        id
    }

    pub fn seed_relationship(&mut self, relationship: StoredRelationship) {
        self.committed.relationships.push(relationship.clone());
        self.staged.relationships.push(relationship);
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn evicted(&self) -> &[RecordId] {
        &self.evicted
    }

    /// Records touched since their last eviction.
    pub fn cached(&self) -> &BTreeSet<RecordId> {
        &self.cached
    }

    fn touch(&mut self, id: RecordId) {
        self.cached.insert(id);
    }
}

impl RecordStore for MemoryStore {
    fn find(&self, id: RecordId) -> StoreResult<Option<StoredRecord>> {
        Ok(self.staged.record(id).map(MemoryRecord::summary))
    }

    fn find_by_field_value(&self, field: &FieldKey, value: &str) -> StoreResult<Vec<RecordId>> {
        let dotted = field.dotted();
        Ok(self
            .staged
            .records
            .iter()
            .filter(|record| {
                record
                    .metadata
                    .iter()
                    .any(|candidate| candidate.field.dotted() == dotted && candidate.value == value)
            })
            .map(|record| record.id)
            .collect())
    }

    fn metadata(&self, id: RecordId, field: &FieldKey) -> StoreResult<Vec<MetadataValue>> {
        let record = self
            .staged
            .record(id)
            .ok_or(StoreError::RecordNotFound { id })?;
        Ok(record.values(field).cloned().collect())
    }

    fn create(&mut self, owning: ContainerId, use_template: bool) -> StoreResult<RecordId> {
        self.creates += 1;
        if self.fail_on_create == Some(self.creates) {
            return Err(StoreError::Backend {
                message: format!("create #{} rejected", self.creates),
            });
        }
        let container = self.staged.container(owning)?;
        let mut record = MemoryRecord::new(owning);
        record.state = SubmissionState::InProgress;
        if use_template {
            record.metadata = container.template.clone();
        }
        let id = record.id;
        self.staged.records.push(record);
        self.touch(id);
        debug!(record = %id, container = %owning, "record created");
        Ok(id)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        let before = self.staged.records.len();
        self.staged.records.retain(|record| record.id != id);
        if self.staged.records.len() == before {
            return Err(StoreError::RecordNotFound { id });
        }
        self.staged
            .relationships
            .retain(|relationship| !relationship.involves(id));
        self.touch(id);
        Ok(())
    }

    fn set_withdrawn(&mut self, id: RecordId, withdrawn: bool) -> StoreResult<()> {
        self.staged.record_mut(id)?.withdrawn = withdrawn;
        self.touch(id);
        Ok(())
    }

    fn add_metadata(&mut self, id: RecordId, value: &MetadataValue) -> StoreResult<()> {
        self.staged.record_mut(id)?.metadata.push(value.clone());
        self.touch(id);
        Ok(())
    }

    fn clear_metadata(&mut self, id: RecordId, field: &FieldKey) -> StoreResult<usize> {
        let record = self.staged.record_mut(id)?;
        let before = record.metadata.len();
        record.metadata.retain(|value| &value.field != field);
        let removed = before - record.metadata.len();
        self.touch(id);
        Ok(removed)
    }

    fn relationships(&self, id: RecordId) -> StoreResult<Vec<StoredRelationship>> {
        Ok(self
            .staged
            .relationships
            .iter()
            .filter(|relationship| relationship.involves(id))
            .cloned()
            .collect())
    }

    fn add_relationship(&mut self, relationship: StoredRelationship) -> StoreResult<()> {
        for id in [relationship.left, relationship.right] {
            if self.staged.record(id).is_none() {
                return Err(StoreError::RecordNotFound { id });
            }
        }
        self.touch(relationship.left);
        self.touch(relationship.right);
        self.staged.relationships.push(relationship);
        Ok(())
    }

    fn clear_relationships(
        &mut self,
        id: RecordId,
        type_id: u32,
        direction: RelationDirection,
    ) -> StoreResult<usize> {
        let before = self.staged.relationships.len();
        self.staged.relationships.retain(|relationship| {
            let side = match direction {
                RelationDirection::OriginIsLeft => relationship.left,
                RelationDirection::OriginIsRight => relationship.right,
            };
            !(relationship.type_id == type_id && side == id)
        });
        Ok(before - self.staged.relationships.len())
    }

    fn start_workflow(&mut self, id: RecordId, notify: bool) -> StoreResult<()> {
        self.staged.record_mut(id)?.state = SubmissionState::InWorkflow;
        debug!(record = %id, notify, "workflow started");
        Ok(())
    }

    fn archive(&mut self, id: RecordId) -> StoreResult<()> {
        self.staged.record_mut(id)?.state = SubmissionState::Archived;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.committed = self.staged.clone();
        self.commits += 1;
        Ok(())
    }

    fn abort(&mut self) -> StoreResult<()> {
        self.staged = self.committed.clone();
        self.cached.clear();
        Ok(())
    }

    fn evict(&mut self, ids: &[RecordId]) {
        for id in ids {
            self.cached.remove(id);
            self.evicted.push(*id);
        }
    }
}

impl ContainerStore for MemoryStore {
    fn resolve_container(&self, handle: &str) -> StoreResult<Option<ContainerId>> {
        Ok(self
            .staged
            .container_by_handle(handle)
            .map(|container| container.id))
    }

    fn add_member(&mut self, container: ContainerId, record: RecordId) -> StoreResult<()> {
        self.staged.container(container)?;
        let entry = self.staged.record_mut(record)?;
        if entry.owning_container != Some(container) && !entry.mapped_containers.contains(&container)
        {
            entry.mapped_containers.push(container);
        }
        self.touch(record);
        Ok(())
    }

    fn remove_member(&mut self, container: ContainerId, record: RecordId) -> StoreResult<()> {
        self.staged
            .record_mut(record)?
            .mapped_containers
            .retain(|mapped| *mapped != container);
        self.touch(record);
        Ok(())
    }

    fn set_owner(&mut self, record: RecordId, container: ContainerId) -> StoreResult<()> {
        self.staged.container(container)?;
        let entry = self.staged.record_mut(record)?;
        entry.owning_container = Some(container);
        entry.mapped_containers.retain(|mapped| *mapped != container);
        self.touch(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_discards_staged_changes() {
        let mut store = MemoryStore::new();
        let container = store.add_container("123/1", "Articles");
        let first = store.create(container, false).expect("create");
        store.commit().expect("commit");
        let second = store.create(container, false).expect("create");
        store.abort().expect("abort");

        assert!(store.find(first).expect("find").is_some());
        assert!(store.find(second).expect("find").is_none());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn template_metadata_is_copied() {
        let mut store = MemoryStore::new();
        let container = store.add_container("123/1", "Articles");
        store.staged.containers[0]
            .template
            .push(MetadataValue::plain(FieldKey::new("dc", "rights", None), "CC-BY"));
        let id = store.create(container, true).expect("create");
        let rights = store
            .metadata(id, &FieldKey::new("dc", "rights", None))
            .expect("metadata");
        assert_eq!(rights.len(), 1);
    }

    #[test]
    fn injected_failure_hits_requested_create() {
        let mut store = MemoryStore::new().with_failing_create(2);
        let container = store.add_container("123/1", "Articles");
        assert!(store.create(container, false).is_ok());
        assert!(matches!(
            store.create(container, false),
            Err(StoreError::Backend { .. })
        ));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut store = MemoryStore::new();
        let container = store.add_container("123/1", "Articles");
        store.seed_record(MemoryRecord::new(container).with_entity_type("Person"));
        let json = serde_json::to_string(store.snapshot()).expect("serialize");
        let snapshot: StoreSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(&snapshot, store.snapshot());
        assert_eq!(snapshot.records[0].entity_type(), Some("Person"));
    }
}
