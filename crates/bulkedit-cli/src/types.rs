use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use bulkedit_apply::ApplyReport;
use bulkedit_model::{ChangeSet, Identifier, ImportOptions, LifecycleAction, RowNumber};

/// Condensed view of one change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub row: RowNumber,
    pub target: Identifier,
    pub is_new: bool,
    pub row_name: Option<String>,
    pub adds: usize,
    pub removes: usize,
    pub kept: usize,
    pub container_changes: usize,
    pub action: Option<LifecycleAction>,
}

impl From<&ChangeSet> for ChangeSummary {
    fn from(change: &ChangeSet) -> Self {
        let containers = &change.containers;
        Self {
            row: change.row,
            target: change.target,
            is_new: change.is_new,
            row_name: change.row_name.clone(),
            adds: change.adds().count(),
            removes: change.removes().count(),
            kept: change.constants().count(),
            container_changes: usize::from(containers.owning.is_some())
                + containers.added.len()
                + containers.removed.len(),
            action: change.action,
        }
    }
}

/// Everything one command run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub rows: usize,
    pub relation_targets: usize,
    pub relation_edges: usize,
    pub changes: Vec<ChangeSummary>,
    /// Absent for `preview`.
    pub apply: Option<ApplyReport>,
}

impl RunSummary {
    pub fn new_records(&self) -> usize {
        self.changes.iter().filter(|change| change.is_new).count()
    }

    pub fn is_dry_run(&self) -> bool {
        self.apply.is_none()
    }
}

/// Contents of the `--report` file.
#[derive(Debug, Serialize)]
pub struct ReportFile<'a> {
    pub generated_at: DateTime<Utc>,
    pub options: &'a ImportOptions,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

impl<'a> ReportFile<'a> {
    pub fn new(options: &'a ImportOptions, summary: &'a RunSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            options,
            summary,
        }
    }
}
