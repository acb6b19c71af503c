//! Diffing of a row's desired values against live record state.

use std::collections::BTreeMap;

use tracing::debug;

use bulkedit_model::{
    ChangeSet, ColumnKey, ContainerId, FieldKey, Identifier, ImportError, ImportOptions,
    LifecycleAction, MetadataValue, RecordId, Result, Row, RowNumber,
};

use crate::store::{ContainerStore, RecordStore, StoredRecord};

/// Removes newline variants and surrounding whitespace.
pub fn clean(value: &str) -> String {
    value.replace("\r\n", "").replace('\n', "").trim().to_string()
}

/// Equality after [`clean`].
pub fn normalized_eq(left: &str, right: &str) -> bool {
    clean(left) == clean(right)
}

fn contains_normalized(needle: &str, haystack: &[String]) -> bool {
    haystack.iter().any(|candidate| normalized_eq(candidate, needle))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Resolved relation targets of one row, per relation column.
pub type ResolvedRelations = BTreeMap<String, Vec<Identifier>>;

/// Desired values of one field, merged over every column naming it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredField {
    pub field: FieldKey,
    /// Set when only external authority feeds (`SOURCE:field` columns) name
    /// the field. Such a field never loses stored values.
    pub authority_source: Option<String>,
    pub values: Vec<MetadataValue>,
}

impl DesiredField {
    fn new(field: FieldKey, authority_source: Option<String>) -> Self {
        Self {
            field,
            authority_source,
            values: Vec::new(),
        }
    }

    /// Adds one column's values, skipping values already listed.
    fn merge(&mut self, authority_source: Option<String>, values: Vec<MetadataValue>, separator: &str) {
        if authority_source.is_none() {
            self.authority_source = None;
        }
        for value in values {
            let rendered = value.render(separator);
            if !self
                .values
                .iter()
                .any(|listed| normalized_eq(&listed.render(separator), &rendered))
            {
                self.values.push(value);
            }
        }
    }
}

/// Computes the change set of one row.
pub struct ChangeComputer<'a, S: RecordStore + ContainerStore + ?Sized> {
    store: &'a S,
    options: &'a ImportOptions,
}

impl<'a, S: RecordStore + ContainerStore + ?Sized> ChangeComputer<'a, S> {
    pub fn new(store: &'a S, options: &'a ImportOptions) -> Self {
        Self { store, options }
    }

    /// Change set for `row`, or `None` when an existing record would not
    /// change.
    pub fn compute(&self, row: &Row, relations: &ResolvedRelations) -> Result<Option<ChangeSet>> {
        if !row.action.trim().is_empty() && row.is_new() {
            return Err(ImportError::ActionNotAllowed {
                row: row.number,
                action: row.action.clone(),
                reason: "actions are not allowed on new records".to_string(),
            });
        }
        let desired = self.desired_fields(row, relations);
        let mut change = match row.id {
            Some(id) => self.compute_existing(row, id, &desired)?,
            None => self.compute_new(row, &desired)?,
        };
        change.row_name = row.row_name().map(str::to_string);
        change.order_entity_type_first();
        Ok(change.has_changes().then_some(change))
    }

    /// Desired values per field, authority-clean unless the field is
    /// authority controlled. Columns naming the same field (a plain column
    /// next to a `SOURCE:` feed) are merged into one list. Relation columns
    /// carry resolved targets.
    pub fn desired_fields(&self, row: &Row, relations: &ResolvedRelations) -> Vec<DesiredField> {
        let separator = self.options.authority_separator.as_str();
        let mut fields: Vec<DesiredField> = Vec::new();
        for (key, raw_values) in &row.values {
            let ColumnKey::Metadata {
                field,
                authority_source,
            } = ColumnKey::parse(key)
            else {
                continue;
            };
            let values = if field.is_relation() {
                relations
                    .get(key)
                    .into_iter()
                    .flatten()
                    .map(|target| {
                        MetadataValue::plain(field.clone(), target.to_string()).with_target(*target)
                    })
                    .collect()
            } else if authority_source.is_some() {
                raw_values
                    .iter()
                    .map(|raw| MetadataValue::plain(field.clone(), raw.as_str()))
                    .collect()
            } else if self.options.is_authority_controlled(&field.dotted()) {
                raw_values
                    .iter()
                    .map(|raw| MetadataValue::parse_with_authority(field.clone(), raw, separator))
                    .collect()
            } else {
                raw_values
                    .iter()
                    .map(|raw| {
                        let clean = match raw.split_once(separator) {
                            Some((before, _)) if !separator.is_empty() => before,
                            _ => raw.as_str(),
                        };
                        MetadataValue::plain(field.clone(), clean)
                    })
                    .collect()
            };
            match fields.iter().position(|desired| desired.field == field) {
                Some(index) => fields[index].merge(authority_source, values, separator),
                None => {
                    let mut desired = DesiredField::new(field, authority_source.clone());
                    desired.merge(authority_source, values, separator);
                    fields.push(desired);
                }
            }
        }
        fields
    }

    fn compute_new(&self, row: &Row, desired: &[DesiredField]) -> Result<ChangeSet> {
        let mut change = ChangeSet::new_record(row.number);
        for field in desired {
            for value in &field.values {
                if !is_blank(&value.value) {
                    change.register_add(value.clone());
                }
            }
        }

        let handles = row.collections().unwrap_or_default();
        if handles.is_empty() {
            return Err(ImportError::MissingContainer {
                row: row.number,
                handle: None,
            });
        }
        let mut resolved: Vec<ContainerId> = Vec::with_capacity(handles.len());
        for handle in handles {
            let container = self.resolve_container(row.number, handle)?;
            if resolved.contains(&container) {
                return Err(ImportError::DuplicateContainer {
                    row: row.number,
                    handle: handle.clone(),
                });
            }
            resolved.push(container);
        }
        let mut resolved = resolved.into_iter();
        change.containers.owning = resolved.next();
        change.containers.added.extend(resolved);
        Ok(change)
    }

    fn compute_existing(&self, row: &Row, id: RecordId, desired: &[DesiredField]) -> Result<ChangeSet> {
        let record = self
            .store
            .find(id)
            .map_err(|source| ImportError::persistence(row.number, source))?
            .ok_or(ImportError::UnknownRecord { row: row.number, id })?;
        let mut change = ChangeSet::existing(row.number, id);

        if let Some(handles) = row.collections() {
            if handles.is_empty() {
                return Err(ImportError::MissingContainer {
                    row: row.number,
                    handle: None,
                });
            }
            self.compare_containers(row.number, &record, handles, &mut change)?;
        }

        for field in desired {
            self.compare_field(row.number, id, field, &mut change)?;
        }

        self.parse_action(row, &record, &mut change)?;
        Ok(change)
    }

    fn resolve_container(&self, row: RowNumber, handle: &str) -> Result<ContainerId> {
        self.store
            .resolve_container(handle)
            .map_err(|source| ImportError::persistence(row, source))?
            .ok_or_else(|| ImportError::MissingContainer {
                row,
                handle: Some(handle.to_string()),
            })
    }

    fn compare_containers(
        &self,
        row: RowNumber,
        record: &StoredRecord,
        handles: &[String],
        change: &mut ChangeSet,
    ) -> Result<()> {
        let owner = self.resolve_container(row, &handles[0])?;
        if record.owning_container != Some(owner) {
            change.containers.owning = Some(owner);
            change.containers.previous_owning = record.owning_container;
        }

        let mut listed = Vec::new();
        for handle in &handles[1..] {
            let container = self.resolve_container(row, handle)?;
            listed.push(container);
            if !record.mapped_containers.contains(&container)
                && !change.containers.added.contains(&container)
                && container != owner
            {
                change.containers.added.push(container);
            }
        }
        for held in &record.mapped_containers {
            if !listed.contains(held) && *held != owner {
                change.containers.removed.push(*held);
            }
        }
        Ok(())
    }

    fn compare_field(
        &self,
        row: RowNumber,
        id: RecordId,
        desired: &DesiredField,
        change: &mut ChangeSet,
    ) -> Result<()> {
        let separator = self.options.authority_separator.as_str();
        let controlled = self.options.is_authority_controlled(&desired.field.dotted());
        let current = self
            .store
            .metadata(id, &desired.field)
            .map_err(|source| ImportError::persistence(row, source))?;
        let current_rendered: Vec<String> = current
            .iter()
            .map(|value| {
                if controlled {
                    value.render(separator)
                } else {
                    value.value.clone()
                }
            })
            .collect();
        let desired_rendered: Vec<String> = desired
            .values
            .iter()
            .map(|value| value.render(separator))
            .collect();

        for (value, rendered) in desired.values.iter().zip(&desired_rendered) {
            if is_blank(rendered) {
                continue;
            }
            if contains_normalized(rendered, &current_rendered) {
                change.register_constant(value.clone());
            } else {
                change.register_add(value.clone());
            }
        }

        for (value, rendered) in current.into_iter().zip(&current_rendered) {
            if is_blank(rendered) || contains_normalized(rendered, &desired_rendered) {
                continue;
            }
            if desired.authority_source.is_some() {
                // feeds only add; values they do not list stay in place
                change.register_constant(value);
            } else {
                debug!(%row, field = %desired.field, "value scheduled for removal");
                change.register_remove(value);
            }
        }
        Ok(())
    }

    fn parse_action(&self, row: &Row, record: &StoredRecord, change: &mut ChangeSet) -> Result<()> {
        let token = row.action.trim();
        if token.is_empty() {
            return Ok(());
        }
        let action = LifecycleAction::from_token(token).ok_or_else(|| ImportError::UnknownAction {
            row: row.number,
            action: token.to_string(),
        })?;
        change.action = match action {
            LifecycleAction::Delete if !self.options.allow_expunge => {
                return Err(ImportError::ActionNotAllowed {
                    row: row.number,
                    action: token.to_string(),
                    reason: "deletes are disabled by configuration".to_string(),
                });
            }
            LifecycleAction::Delete => Some(action),
            LifecycleAction::Withdraw => (!record.withdrawn).then_some(action),
            LifecycleAction::Reinstate => record.withdrawn.then_some(action),
        };
        Ok(())
    }
}
