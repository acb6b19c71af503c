//! Relationship graph validation.
//!
//! Runs once after the resolve stage. Every recorded edge is checked against
//! the relationship type catalog and every failure is collected; the batch
//! fails as a whole when at least one diagnostic was recorded.

use std::collections::BTreeSet;

use tracing::{debug, info, info_span, warn};

use bulkedit_core::{BatchContext, RecordStore, RelationshipTypeCatalog, ScannedBatch};
use bulkedit_model::{
    ChangeSet, Identifier, ImportError, RelationDiagnostic, Result, RowNumber, relation_base_name,
};

use crate::plan::{PlannedRelation, RelationPlan, RelationReport};

/// Output of the validate stage, ready to be applied.
#[derive(Debug)]
pub struct ValidatedBatch {
    pub change_sets: Vec<ChangeSet>,
    pub context: BatchContext,
    pub plan: RelationPlan,
    pub report: RelationReport,
}

/// Checks relation edges against declared relationship types.
pub struct RelationValidator<'a, S: RecordStore + ?Sized, C: RelationshipTypeCatalog + ?Sized> {
    store: &'a S,
    catalog: &'a C,
}

impl<'a, S, C> RelationValidator<'a, S, C>
where
    S: RecordStore + ?Sized,
    C: RelationshipTypeCatalog + ?Sized,
{
    pub fn new(store: &'a S, catalog: &'a C) -> Self {
        Self { store, catalog }
    }

    /// Walks the whole graph. Diagnostics land in the report; only store
    /// failures return early.
    pub fn check(&self, context: &BatchContext) -> Result<(RelationReport, RelationPlan)> {
        let graph = context.graph();
        let mut report = RelationReport {
            edges: graph.edge_count(),
            ..RelationReport::default()
        };
        let mut plan = RelationPlan::new();

        for (target, keys) in graph.targets() {
            report.targets += 1;
            let Some(target_type) = self.target_type(context, *target)? else {
                let referenced_by: BTreeSet<RowNumber> = keys
                    .values()
                    .flatten()
                    .filter_map(|origin| context.index().row_of(*origin))
                    .collect();
                report.diagnostics.push(RelationDiagnostic::UnresolvedTargetType {
                    target: *target,
                    referenced_by: referenced_by.into_iter().collect(),
                });
                continue;
            };

            for (relation_key, origins) in keys {
                for origin in origins {
                    let row = context.index().row_of(*origin);
                    let Some(origin_type) = self.origin_type(context, *origin, row)? else {
                        report.diagnostics.push(RelationDiagnostic::UnresolvedOriginType {
                            row,
                            relation_key: relation_key.clone(),
                            origin: *origin,
                        });
                        continue;
                    };
                    match self.match_type(&origin_type, &target_type, relation_key) {
                        Some(planned) => {
                            debug!(
                                origin = %origin,
                                target = %target,
                                relation_key = %relation_key,
                                type_id = planned.type_id,
                                "relation typed"
                            );
                            plan.insert(*origin, relation_key, *target, planned);
                        }
                        None => report.diagnostics.push(RelationDiagnostic::TypeMismatch {
                            row,
                            relation_key: relation_key.clone(),
                            target_type: target_type.clone(),
                            origin_type,
                        }),
                    }
                }
            }
        }
        Ok((report, plan))
    }

    /// Batch type map first, then the store.
    fn target_type(&self, context: &BatchContext, target: Identifier) -> Result<Option<String>> {
        if let Some(entity_type) = context.index().entity_type(target) {
            return Ok(Some(entity_type.to_string()));
        }
        self.stored_type(target)
    }

    /// Batch type map, then the origin row's own columns, then the store.
    fn origin_type(
        &self,
        context: &BatchContext,
        origin: Identifier,
        row: Option<RowNumber>,
    ) -> Result<Option<String>> {
        if let Some(entity_type) = context.index().entity_type(origin) {
            return Ok(Some(entity_type.to_string()));
        }
        if let Some(entity_type) = row
            .and_then(|number| context.row(number))
            .and_then(|raw| raw.entity_type())
        {
            return Ok(Some(entity_type));
        }
        self.stored_type(origin)
    }

    fn stored_type(&self, identifier: Identifier) -> Result<Option<String>> {
        let Some(id) = identifier.persisted() else {
            return Ok(None);
        };
        let record = self
            .store
            .find(id)
            .map_err(|source| ImportError::Persistence { row: None, source })?;
        Ok(record
            .and_then(|record| record.entity_type)
            .map(|entity_type| entity_type.trim().to_string())
            .filter(|entity_type| !entity_type.is_empty()))
    }

    /// First declared type whose roles and entity types fit the edge.
    fn match_type(
        &self,
        origin_type: &str,
        target_type: &str,
        relation_key: &str,
    ) -> Option<PlannedRelation> {
        self.catalog
            .find_by_role_name(relation_base_name(relation_key))
            .into_iter()
            .find_map(|candidate| {
                candidate
                    .orient(origin_type, target_type, relation_key)
                    .map(|direction| PlannedRelation {
                        type_id: candidate.id,
                        direction,
                    })
            })
    }
}

/// Validate stage: fails with one aggregate error listing every diagnostic.
pub fn validate<S, C>(scanned: ScannedBatch, store: &S, catalog: &C) -> Result<ValidatedBatch>
where
    S: RecordStore + ?Sized,
    C: RelationshipTypeCatalog + ?Sized,
{
    let span = info_span!("validate", edges = scanned.context.graph().edge_count());
    let _guard = span.enter();

    let (report, plan) = RelationValidator::new(store, catalog).check(&scanned.context)?;
    if report.has_errors() {
        for diagnostic in &report.diagnostics {
            warn!(%diagnostic, "relation rejected");
        }
        warn!(errors = report.error_count(), "relation validation failed");
        return Err(ImportError::RelationshipTypeMismatch {
            diagnostics: report.diagnostics,
        });
    }
    info!(
        targets = report.targets,
        edges = report.edges,
        typed = plan.len(),
        "relations validated"
    );
    Ok(ValidatedBatch {
        change_sets: scanned.change_sets,
        context: scanned.context,
        plan,
        report,
    })
}
