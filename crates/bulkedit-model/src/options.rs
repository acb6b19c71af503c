//! Configuration options for bulk import runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default number of records per commit checkpoint.
pub const DEFAULT_CHECKPOINT_SIZE: usize = 100;

/// What happens to a newly created record once its metadata is in place.
///
/// These flags belong to the caller; the engine only passes them on to the
/// submission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFlags {
    /// Create new records from their container's template.
    pub use_template: bool,
    /// Send new records into the review workflow.
    pub use_workflow: bool,
    /// Notify reviewers when the workflow starts.
    pub notify_on_workflow_start: bool,
    /// Archive new records straight away when no workflow is used.
    pub archive_immediately: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            use_template: false,
            use_workflow: false,
            notify_on_workflow_start: false,
            archive_immediately: true,
        }
    }
}

/// Options controlling resolution, diffing and apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Separator between value, authority and confidence in one cell.
    pub authority_separator: String,
    /// Separator between multiple values in one cell.
    pub value_separator: String,
    /// Allow the `expunge` action.
    pub allow_expunge: bool,
    /// Records per commit checkpoint.
    pub checkpoint_size: usize,
    /// Dotted field names whose stored authority takes part in comparison.
    pub authority_controlled_fields: BTreeSet<String>,
    pub policy: PolicyFlags,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            authority_separator: "::".to_string(),
            value_separator: "||".to_string(),
            allow_expunge: false,
            checkpoint_size: DEFAULT_CHECKPOINT_SIZE,
            authority_controlled_fields: BTreeSet::new(),
            policy: PolicyFlags::default(),
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint_size(mut self, size: usize) -> Self {
        self.checkpoint_size = size;
        self
    }

    pub fn with_allow_expunge(mut self, allow: bool) -> Self {
        self.allow_expunge = allow;
        self
    }

    pub fn with_policy(mut self, policy: PolicyFlags) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_authority_controlled(mut self, field: impl Into<String>) -> Self {
        self.authority_controlled_fields.insert(field.into());
        self
    }

    /// Checkpoint size, never below one.
    pub fn effective_checkpoint_size(&self) -> usize {
        self.checkpoint_size.max(1)
    }

    pub fn is_authority_controlled(&self, dotted_field: &str) -> bool {
        self.authority_controlled_fields.contains(dotted_field)
    }
}
