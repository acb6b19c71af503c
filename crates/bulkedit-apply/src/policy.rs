use tracing::debug;

use bulkedit_core::{RecordStore, StoreResult};
use bulkedit_model::{PolicyFlags, RecordId};

/// What happens to a newly created record once its metadata is in place.
pub trait SubmissionPolicy {
    /// Whether new records start from their container's template.
    fn use_template(&self) -> bool;

    fn finish(&self, store: &mut dyn RecordStore, id: RecordId) -> StoreResult<()>;
}

/// Workflow when requested, otherwise archive when requested, otherwise
/// leave the record in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPolicy {
    flags: PolicyFlags,
}

impl StandardPolicy {
    pub fn new(flags: PolicyFlags) -> Self {
        Self { flags }
    }
}

impl From<PolicyFlags> for StandardPolicy {
    fn from(flags: PolicyFlags) -> Self {
        Self::new(flags)
    }
}

impl SubmissionPolicy for StandardPolicy {
    fn use_template(&self) -> bool {
        self.flags.use_template
    }

    fn finish(&self, store: &mut dyn RecordStore, id: RecordId) -> StoreResult<()> {
        if self.flags.use_workflow {
            debug!(record = %id, notify = self.flags.notify_on_workflow_start, "starting workflow");
            store.start_workflow(id, self.flags.notify_on_workflow_start)
        } else if self.flags.archive_immediately {
            store.archive(id)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use bulkedit_core::{MemoryStore, SubmissionState};

    use super::*;

    fn created(store: &mut MemoryStore) -> RecordId {
        let container = store.add_container("123/1", "Articles");
        store.create(container, false).expect("create")
    }

    fn state(store: &MemoryStore, id: RecordId) -> SubmissionState {
        store.find(id).expect("find").expect("record").state
    }

    #[test]
    fn default_flags_archive() {
        let mut store = MemoryStore::new();
        let id = created(&mut store);
        StandardPolicy::default().finish(&mut store, id).expect("finish");
        assert_eq!(state(&store, id), SubmissionState::Archived);
    }

    #[test]
    fn workflow_takes_precedence() {
        let mut store = MemoryStore::new();
        let id = created(&mut store);
        let policy = StandardPolicy::new(PolicyFlags {
            use_workflow: true,
            ..PolicyFlags::default()
        });
        policy.finish(&mut store, id).expect("finish");
        assert_eq!(state(&store, id), SubmissionState::InWorkflow);
    }

    #[test]
    fn no_archive_leaves_record_in_progress() {
        let mut store = MemoryStore::new();
        let id = created(&mut store);
        let policy = StandardPolicy::new(PolicyFlags {
            archive_immediately: false,
            ..PolicyFlags::default()
        });
        policy.finish(&mut store, id).expect("finish");
        assert_eq!(state(&store, id), SubmissionState::InProgress);
    }
}
