use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use bulkedit_model::{Identifier, RecordId, RowNumber};

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Created,
    Deleted,
    Withdrawn,
    Reinstated,
    Updated,
    Unchanged,
}

impl RecordOutcome {
    pub fn label(self) -> &'static str {
        match self {
            RecordOutcome::Created => "created",
            RecordOutcome::Deleted => "deleted",
            RecordOutcome::Withdrawn => "withdrawn",
            RecordOutcome::Reinstated => "reinstated",
            RecordOutcome::Updated => "updated",
            RecordOutcome::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub row: RowNumber,
    /// Identifier the record had during resolution.
    pub target: Identifier,
    pub record: RecordId,
    pub outcome: RecordOutcome,
}

/// Result of the apply stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub records: Vec<RecordReport>,
    pub commits: usize,
    /// Row of each created record to its persisted id.
    pub placeholders: BTreeMap<RowNumber, RecordId>,
}

impl ApplyReport {
    pub fn count(&self, outcome: RecordOutcome) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome == outcome)
            .count()
    }

    /// Outcome counts in declaration order, zero counts omitted.
    pub fn outcome_counts(&self) -> BTreeMap<RecordOutcome, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.outcome).or_insert(0) += 1;
        }
        counts
    }
}
