//! Resolve stage: one pass over the batch.

use tracing::{debug, info, info_span};

use bulkedit_model::{ChangeSet, ColumnKey, ImportOptions, RelationEdge, Result, Row};

use crate::changes::{ChangeComputer, ResolvedRelations};
use crate::context::BatchContext;
use crate::resolver::{ReferenceResolver, evaluate_record_id};
use crate::store::Repository;

/// Output of the resolve stage.
#[derive(Debug)]
pub struct ScannedBatch {
    /// Change sets in input order; rows without net change are absent.
    pub change_sets: Vec<ChangeSet>,
    pub context: BatchContext,
}

impl ScannedBatch {
    pub fn row_count(&self) -> usize {
        self.context.row_count()
    }
}

/// Scans every row once: resolves its relation references, records the
/// resulting edges, computes its change set and indexes it for later rows.
///
/// Nothing is written to the store.
pub fn scan<S: Repository + ?Sized>(
    store: &S,
    options: &ImportOptions,
    rows: Vec<Row>,
) -> Result<ScannedBatch> {
    let span = info_span!("resolve", rows = rows.len());
    let _guard = span.enter();

    let mut context = BatchContext::new();
    let mut change_sets = Vec::new();
    let computer = ChangeComputer::new(store, options);

    for row in rows {
        let identifier = evaluate_record_id(&row);
        let relations = resolve_relations(store, &mut context, &row)?;
        if let Some(change) = computer.compute(&row, &relations)? {
            debug!(
                row = %row.number,
                target = %change.target,
                operations = change.operations.len(),
                "change set computed"
            );
            change_sets.push(change);
        }
        context.finish_row(row, identifier);
    }

    info!(
        rows = context.row_count(),
        change_sets = change_sets.len(),
        edges = context.graph().edge_count(),
        "batch scanned"
    );
    Ok(ScannedBatch {
        change_sets,
        context,
    })
}

fn resolve_relations<S: Repository + ?Sized>(
    store: &S,
    context: &mut BatchContext,
    row: &Row,
) -> Result<ResolvedRelations> {
    let origin = evaluate_record_id(row);
    let mut resolved = ResolvedRelations::new();
    let mut edges = Vec::new();
    {
        let resolver = ReferenceResolver::new(store, context.index());
        for (key, values) in &row.values {
            let column = ColumnKey::parse(key);
            let Some(field) = column.field().filter(|field| field.is_relation()) else {
                continue;
            };
            let relation_key = field.to_string();
            let targets = resolved.entry(key.clone()).or_default();
            for raw in values.iter().filter(|value| !value.trim().is_empty()) {
                let target = resolver.resolve(row.number, key, raw.trim())?;
                targets.push(target);
                edges.push(RelationEdge {
                    target,
                    relation_key: relation_key.clone(),
                    origin,
                });
            }
        }
    }
    for edge in edges {
        context.record_edge(edge);
    }
    Ok(resolved)
}
