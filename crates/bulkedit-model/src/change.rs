use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ContainerId, FieldKey, Identifier, MetadataOperation, MetadataValue, RecordId, RowNumber};

/// Lifecycle action requested through the `action` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Delete,
    Withdraw,
    Reinstate,
}

impl LifecycleAction {
    /// Maps an action token. `None` for an unrecognized token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "expunge" => Some(LifecycleAction::Delete),
            "withdraw" => Some(LifecycleAction::Withdraw),
            "reinstate" => Some(LifecycleAction::Reinstate),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            LifecycleAction::Delete => "expunge",
            LifecycleAction::Withdraw => "withdraw",
            LifecycleAction::Reinstate => "reinstate",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Container membership changes for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerChanges {
    /// New owning container (for new records, the initial owner).
    pub owning: Option<ContainerId>,
    /// Owning container being replaced.
    pub previous_owning: Option<ContainerId>,
    pub added: Vec<ContainerId>,
    pub removed: Vec<ContainerId>,
}

impl ContainerChanges {
    pub fn is_empty(&self) -> bool {
        self.owning.is_none() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Everything that has to happen to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub row: RowNumber,
    pub target: Identifier,
    pub is_new: bool,
    pub row_name: Option<String>,
    pub containers: ContainerChanges,
    pub operations: Vec<MetadataOperation>,
    pub action: Option<LifecycleAction>,
}

impl ChangeSet {
    pub fn new_record(row: RowNumber) -> Self {
        Self {
            row,
            target: Identifier::Placeholder(row),
            is_new: true,
            row_name: None,
            containers: ContainerChanges::default(),
            operations: Vec::new(),
            action: None,
        }
    }

    pub fn existing(row: RowNumber, id: RecordId) -> Self {
        Self {
            row,
            target: Identifier::Persisted(id),
            is_new: false,
            row_name: None,
            containers: ContainerChanges::default(),
            operations: Vec::new(),
            action: None,
        }
    }

    pub fn register_add(&mut self, value: MetadataValue) {
        self.operations.push(MetadataOperation::Add(value));
    }

    pub fn register_remove(&mut self, value: MetadataValue) {
        self.operations.push(MetadataOperation::Remove(value));
    }

    pub fn register_constant(&mut self, value: MetadataValue) {
        self.operations.push(MetadataOperation::Constant(value));
    }

    pub fn adds(&self) -> impl Iterator<Item = &MetadataValue> {
        self.operations.iter().filter_map(|op| match op {
            MetadataOperation::Add(value) => Some(value),
            _ => None,
        })
    }

    pub fn removes(&self) -> impl Iterator<Item = &MetadataValue> {
        self.operations.iter().filter_map(|op| match op {
            MetadataOperation::Remove(value) => Some(value),
            _ => None,
        })
    }

    pub fn constants(&self) -> impl Iterator<Item = &MetadataValue> {
        self.operations.iter().filter_map(|op| match op {
            MetadataOperation::Constant(value) => Some(value),
            _ => None,
        })
    }

    pub fn has_changes(&self) -> bool {
        self.is_new
            || self.action.is_some()
            || !self.containers.is_empty()
            || self.operations.iter().any(MetadataOperation::is_change)
    }

    /// Moves entity-type operations to the front, keeping relative order.
    pub fn order_entity_type_first(&mut self) {
        self.operations
            .sort_by_key(|op| !op.field().is_entity_type());
    }

    /// Operations grouped by field in first-seen order.
    pub fn field_groups(&self) -> Vec<(&FieldKey, Vec<&MetadataOperation>)> {
        let mut groups: Vec<(&FieldKey, Vec<&MetadataOperation>)> = Vec::new();
        for op in &self.operations {
            match groups.iter_mut().find(|(field, _)| *field == op.field()) {
                Some((_, ops)) => ops.push(op),
                None => groups.push((op.field(), vec![op])),
            }
        }
        groups
    }
}
