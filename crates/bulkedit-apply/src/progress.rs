//! Progress reporting for the apply stage.

use std::fmt;

use serde::Serialize;
use tracing::info;

use bulkedit_model::RowNumber;

use crate::report::RecordReport;

/// One commit checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitProgress {
    /// 1-based index of this commit.
    pub commit_index: usize,
    pub total_commits: usize,
    /// 1-based ordinals of the first and last change set covered.
    pub first_record: usize,
    pub last_record: usize,
    pub first_row: RowNumber,
    pub last_row: RowNumber,
    pub total_records: usize,
}

impl fmt::Display for CommitProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commit {}/{}: records {}-{} of {} (rows {}-{})",
            self.commit_index,
            self.total_commits,
            self.first_record,
            self.last_record,
            self.total_records,
            self.first_row,
            self.last_row
        )
    }
}

/// Receives progress of the apply stage.
pub trait ProgressSink {
    /// Called once per commit.
    fn on_commit(&mut self, progress: &CommitProgress);

    /// Called after each record, before its commit.
    fn on_record(&mut self, _record: &RecordReport) {}
}

/// Logs one line per commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_commit(&mut self, progress: &CommitProgress) {
        info!(
            commit = progress.commit_index,
            total = progress.total_commits,
            first_row = %progress.first_row,
            last_row = %progress.last_row,
            "{progress}"
        );
    }
}

/// Keeps every notification, for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingProgress {
    pub commits: Vec<CommitProgress>,
    pub records: Vec<RecordReport>,
}

impl ProgressSink for CollectingProgress {
    fn on_commit(&mut self, progress: &CommitProgress) {
        self.commits.push(*progress);
    }

    fn on_record(&mut self, record: &RecordReport) {
        self.records.push(record.clone());
    }
}
