//! Apply stage: writes validated change sets to the store.
//!
//! Change sets are applied in input order. New records are created before
//! their relations are written, so a placeholder target always refers to a
//! record created earlier in the same run. The store is committed every
//! `checkpoint_size` records and once more after the last record; a failure
//! returns immediately and leaves everything since the last commit staged for
//! the caller to abort.

use std::collections::BTreeMap;

use tracing::{debug, info, info_span};

use bulkedit_core::{RelationshipTypeCatalog, Repository, StoredRelationship, normalized_eq};
use bulkedit_model::{
    ChangeSet, FieldKey, Identifier, ImportError, ImportOptions, LifecycleAction,
    MetadataOperation, MetadataValue, RecordId, RelationDirection, Result, RowNumber,
    relation_base_name,
};
use bulkedit_validate::{RelationPlan, ValidatedBatch};

use crate::policy::{StandardPolicy, SubmissionPolicy};
use crate::progress::{CommitProgress, ProgressSink};
use crate::report::{ApplyReport, RecordOutcome, RecordReport};

/// Applies change sets one record at a time.
pub struct ChangeApplier<'a, S, C, P>
where
    S: Repository,
    C: RelationshipTypeCatalog + ?Sized,
    P: SubmissionPolicy + ?Sized,
{
    store: &'a mut S,
    catalog: &'a C,
    policy: &'a P,
    plan: &'a RelationPlan,
    placeholders: BTreeMap<RowNumber, RecordId>,
}

impl<'a, S, C, P> ChangeApplier<'a, S, C, P>
where
    S: Repository,
    C: RelationshipTypeCatalog + ?Sized,
    P: SubmissionPolicy + ?Sized,
{
    pub fn new(store: &'a mut S, catalog: &'a C, policy: &'a P, plan: &'a RelationPlan) -> Self {
        Self {
            store,
            catalog,
            policy,
            plan,
            placeholders: BTreeMap::new(),
        }
    }

    /// Records created so far, by the row that described them.
    pub fn placeholders(&self) -> &BTreeMap<RowNumber, RecordId> {
        &self.placeholders
    }

    pub fn into_placeholders(self) -> BTreeMap<RowNumber, RecordId> {
        self.placeholders
    }

    /// Applies one change set without committing.
    pub fn apply_change(&mut self, change: &ChangeSet) -> Result<RecordReport> {
        let (record, outcome) = if change.is_new {
            (self.create_record(change)?, RecordOutcome::Created)
        } else {
            let id = self.real_id(change.row, change.target)?;
            (id, self.update_record(change, id)?)
        };
        debug!(row = %change.row, record = %record, %outcome, "record applied");
        Ok(RecordReport {
            row: change.row,
            target: change.target,
            record,
            outcome,
        })
    }

    /// Writes the store commit for the records applied since the last one.
    pub fn commit(&mut self, processed: &[RecordId]) -> Result<()> {
        self.store
            .commit()
            .map_err(|source| ImportError::Persistence { row: None, source })?;
        self.store.evict(processed);
        Ok(())
    }

    fn create_record(&mut self, change: &ChangeSet) -> Result<RecordId> {
        let row = change.row;
        let Some(owning) = change.containers.owning else {
            return Err(ImportError::MissingContainer { row, handle: None });
        };
        let id = self
            .store
            .create(owning, self.policy.use_template())
            .map_err(|source| ImportError::persistence(row, source))?;
        // Later rows may point at this record as soon as it exists.
        self.placeholders.insert(row, id);

        let (relations, plain): (Vec<_>, Vec<_>) =
            change.adds().partition(|value| value.field.is_relation());
        for value in plain {
            self.write_value(row, id, value)?;
        }
        for value in relations {
            self.write_relation(change, id, value)?;
        }

        self.policy
            .finish(&mut *self.store, id)
            .map_err(|source| ImportError::persistence(row, source))?;
        for container in &change.containers.added {
            self.store
                .add_member(*container, id)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        Ok(id)
    }

    fn update_record(&mut self, change: &ChangeSet, id: RecordId) -> Result<RecordOutcome> {
        let row = change.row;
        let lifecycle = match change.action {
            Some(LifecycleAction::Delete) => {
                self.store
                    .delete(id)
                    .map_err(|source| ImportError::persistence(row, source))?;
                return Ok(RecordOutcome::Deleted);
            }
            Some(action) => self.apply_lifecycle(row, id, action)?,
            None => None,
        };

        let containers_changed = self.apply_containers(change, id)?;

        let mut fields_changed = false;
        for (field, operations) in change.field_groups() {
            if !operations.iter().any(|op| op.is_change()) {
                continue;
            }
            fields_changed = true;
            self.rewrite_field(change, id, field, &operations)?;
        }

        Ok(match lifecycle {
            Some(outcome) => outcome,
            None if containers_changed || fields_changed => RecordOutcome::Updated,
            None => RecordOutcome::Unchanged,
        })
    }

    /// Withdraw or reinstate. `None` when the record is already in the
    /// requested state.
    fn apply_lifecycle(
        &mut self,
        row: RowNumber,
        id: RecordId,
        action: LifecycleAction,
    ) -> Result<Option<RecordOutcome>> {
        let withdraw = action == LifecycleAction::Withdraw;
        let current = self
            .store
            .find(id)
            .map_err(|source| ImportError::persistence(row, source))?
            .ok_or(ImportError::UnknownRecord { row, id })?;
        if current.withdrawn == withdraw {
            debug!(row = %row, record = %id, %action, "lifecycle state already reached");
            return Ok(None);
        }
        self.store
            .set_withdrawn(id, withdraw)
            .map_err(|source| ImportError::persistence(row, source))?;
        Ok(Some(if withdraw {
            RecordOutcome::Withdrawn
        } else {
            RecordOutcome::Reinstated
        }))
    }

    fn apply_containers(&mut self, change: &ChangeSet, id: RecordId) -> Result<bool> {
        let row = change.row;
        let containers = &change.containers;
        if let Some(owner) = containers.owning {
            debug!(
                row = %row,
                record = %id,
                from = ?containers.previous_owning,
                to = %owner,
                "owning container changed"
            );
            self.store
                .set_owner(id, owner)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        for container in &containers.removed {
            self.store
                .remove_member(*container, id)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        for container in &containers.added {
            self.store
                .add_member(*container, id)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        Ok(!containers.is_empty())
    }

    /// Clears a field and writes back every value that stays.
    fn rewrite_field(
        &mut self,
        change: &ChangeSet,
        id: RecordId,
        field: &FieldKey,
        operations: &[&MetadataOperation],
    ) -> Result<()> {
        let row = change.row;
        let removed = self
            .store
            .clear_metadata(id, field)
            .map_err(|source| ImportError::persistence(row, source))?;
        debug!(row = %row, record = %id, field = %field, removed, "field cleared");

        if field.is_relation() {
            self.clear_relationships(row, id, field)?;
        }
        let mut written: Vec<&MetadataValue> = Vec::with_capacity(operations.len());
        for op in operations {
            let value = match op {
                MetadataOperation::Add(value) | MetadataOperation::Constant(value) => value,
                MetadataOperation::Remove(_) => continue,
            };
            if written.iter().any(|seen| same_value(seen, value)) {
                debug!(row = %row, field = %field, "duplicate value skipped");
                continue;
            }
            written.push(value);
            if field.is_relation() {
                self.write_relation(change, id, value)?;
            } else {
                self.write_value(row, id, value)?;
            }
        }
        Ok(())
    }

    fn clear_relationships(&mut self, row: RowNumber, id: RecordId, field: &FieldKey) -> Result<()> {
        let key = field.to_string();
        let name = relation_base_name(&key);
        let sides: Vec<(u32, RelationDirection)> = self
            .catalog
            .find_by_role_name(name)
            .into_iter()
            .flat_map(|candidate| {
                let left = candidate
                    .leftward_name
                    .eq_ignore_ascii_case(name)
                    .then_some((candidate.id, RelationDirection::OriginIsLeft));
                let right = candidate
                    .rightward_name
                    .eq_ignore_ascii_case(name)
                    .then_some((candidate.id, RelationDirection::OriginIsRight));
                left.into_iter().chain(right)
            })
            .collect();
        for (type_id, direction) in sides {
            self.store
                .clear_relationships(id, type_id, direction)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        Ok(())
    }

    fn write_value(&mut self, row: RowNumber, id: RecordId, value: &MetadataValue) -> Result<()> {
        self.store
            .add_metadata(id, value)
            .map_err(|source| ImportError::persistence(row, source))
    }

    /// Writes a relation value and the typed relationship behind it.
    fn write_relation(&mut self, change: &ChangeSet, id: RecordId, value: &MetadataValue) -> Result<()> {
        let row = change.row;
        let Some(target) = relation_target(value) else {
            return self.write_value(row, id, value);
        };
        let relation_key = value.field.to_string();
        let planned = self
            .plan
            .get(change.target, &relation_key, target)
            .ok_or_else(|| ImportError::UnplannedRelation {
                row,
                relation_key: relation_key.clone(),
                target,
            })?;
        let target_id = self.real_id(row, target)?;

        let stored = MetadataValue {
            value: target_id.to_string(),
            target: None,
            ..value.clone()
        };
        self.write_value(row, id, &stored)?;

        let relationship =
            StoredRelationship::oriented(planned.type_id, id, target_id, planned.direction);
        let existing = self
            .store
            .relationships(id)
            .map_err(|source| ImportError::persistence(row, source))?;
        if !existing.contains(&relationship) {
            self.store
                .add_relationship(relationship)
                .map_err(|source| ImportError::persistence(row, source))?;
        }
        Ok(())
    }

    fn real_id(&self, row: RowNumber, identifier: Identifier) -> Result<RecordId> {
        match identifier {
            Identifier::Persisted(id) => Ok(id),
            Identifier::Placeholder(placeholder) => self
                .placeholders
                .get(&placeholder)
                .copied()
                .ok_or(ImportError::UnmappedPlaceholder { row, placeholder }),
        }
    }
}

fn same_value(left: &MetadataValue, right: &MetadataValue) -> bool {
    normalized_eq(&left.value, &right.value)
        && left.authority == right.authority
        && left.target == right.target
}

/// Target of a relation value: the resolved identifier, or the stored id for
/// values read back from the store.
fn relation_target(value: &MetadataValue) -> Option<Identifier> {
    value
        .target
        .or_else(|| RecordId::parse(value.value.trim()).ok().map(Identifier::Persisted))
}

/// Applies a validated batch with the submission policy from `options`.
pub fn apply<S, C>(
    batch: &ValidatedBatch,
    store: &mut S,
    catalog: &C,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ApplyReport>
where
    S: Repository,
    C: RelationshipTypeCatalog + ?Sized,
{
    let policy = StandardPolicy::new(options.policy);
    apply_with_policy(batch, store, catalog, &policy, options, progress)
}

/// Applies a validated batch, committing every `checkpoint_size` records.
///
/// On error nothing after the last commit has been committed; the caller
/// should abort the store.
pub fn apply_with_policy<S, C, P>(
    batch: &ValidatedBatch,
    store: &mut S,
    catalog: &C,
    policy: &P,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ApplyReport>
where
    S: Repository,
    C: RelationshipTypeCatalog + ?Sized,
    P: SubmissionPolicy + ?Sized,
{
    let total = batch.change_sets.len();
    let checkpoint = options.effective_checkpoint_size();
    let total_commits = total.div_ceil(checkpoint);
    let span = info_span!("apply", records = total, checkpoint);
    let _guard = span.enter();

    let mut applier = ChangeApplier::new(store, catalog, policy, &batch.plan);
    let mut report = ApplyReport::default();
    let mut processed = Vec::with_capacity(checkpoint);
    let mut chunk_start = 0;

    for (index, change) in batch.change_sets.iter().enumerate() {
        let record = applier.apply_change(change)?;
        progress.on_record(&record);
        processed.push(record.record);
        report.records.push(record);

        let ordinal = index + 1;
        if ordinal % checkpoint != 0 && ordinal != total {
            continue;
        }
        let commit_span = info_span!("commit", index = report.commits + 1);
        let _commit_guard = commit_span.enter();
        applier.commit(&processed)?;
        processed.clear();
        report.commits += 1;

        let commit = CommitProgress {
            commit_index: report.commits,
            total_commits,
            first_record: chunk_start + 1,
            last_record: ordinal,
            first_row: batch.change_sets[chunk_start].row,
            last_row: change.row,
            total_records: total,
        };
        progress.on_commit(&commit);
        chunk_start = ordinal;
    }

    report.placeholders = applier.into_placeholders();
    info!(
        records = report.records.len(),
        created = report.count(RecordOutcome::Created),
        commits = report.commits,
        "batch applied"
    );
    Ok(report)
}
