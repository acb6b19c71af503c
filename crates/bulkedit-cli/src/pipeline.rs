//! Batch import pipeline with explicit stages.
//!
//! 1. **Load**: read options, the store snapshot, the relationship type
//!    catalog and the input rows
//! 2. **Resolve**: resolve references and compute change sets
//! 3. **Validate**: type every relation edge against the catalog
//! 4. **Apply**: write change sets with commit checkpoints
//!
//! `preview` stops after stage 3. The store is a [`MemoryStore`] loaded from a
//! JSON snapshot; only committed state is ever saved back.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};

use bulkedit_apply::{ApplyReport, ProgressSink, apply};
use bulkedit_core::{MemoryStore, RecordStore, StaticCatalog, scan};
use bulkedit_ingest::{LoaderRegistry, load_catalog, load_snapshot, read_json, save_snapshot};
use bulkedit_model::{ImportOptions, PolicyFlags, Row};
use bulkedit_validate::{ValidatedBatch, validate};

use crate::logging::redact_value;
use crate::types::{ChangeSummary, RunSummary};

// ============================================================================
// Stage 1: Load
// ============================================================================

/// Command line settings layered over the `--config` file.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub checkpoint_size: Option<usize>,
    pub allow_expunge: bool,
    pub use_template: bool,
    pub use_workflow: bool,
    pub notify_on_workflow_start: bool,
    pub no_archive: bool,
    pub authority_fields: Vec<String>,
}

/// Options from the config file (or defaults), then the flags on top.
pub fn resolve_options(config: Option<&Path>, overrides: &OptionOverrides) -> Result<ImportOptions> {
    let mut options = match config {
        Some(path) => read_json::<ImportOptions>(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => ImportOptions::default(),
    };
    if let Some(size) = overrides.checkpoint_size {
        options.checkpoint_size = size;
    }
    options.allow_expunge |= overrides.allow_expunge;
    let policy: &mut PolicyFlags = &mut options.policy;
    policy.use_template |= overrides.use_template;
    policy.use_workflow |= overrides.use_workflow;
    policy.notify_on_workflow_start |= overrides.notify_on_workflow_start;
    if overrides.no_archive {
        policy.archive_immediately = false;
    }
    options
        .authority_controlled_fields
        .extend(overrides.authority_fields.iter().cloned());
    debug!(
        checkpoint_size = options.effective_checkpoint_size(),
        allow_expunge = options.allow_expunge,
        "options resolved"
    );
    Ok(options)
}

/// Store and catalog the batch runs against.
#[derive(Debug)]
pub struct Workspace {
    pub store: MemoryStore,
    pub catalog: StaticCatalog,
}

pub fn load_workspace(store: &Path, catalog: &Path) -> Result<Workspace> {
    let snapshot =
        load_snapshot(store).with_context(|| format!("load store {}", store.display()))?;
    let catalog =
        load_catalog(catalog).with_context(|| format!("load catalog {}", catalog.display()))?;
    Ok(Workspace {
        store: MemoryStore::from_snapshot(snapshot),
        catalog,
    })
}

pub fn load_rows(input: &Path, content_type: Option<&str>, options: &ImportOptions) -> Result<Vec<Row>> {
    let rows = LoaderRegistry::standard()
        .load(input, content_type, options)
        .with_context(|| format!("load rows from {}", input.display()))?;
    for row in &rows {
        for (key, values) in &row.values {
            for value in values {
                trace!(row = %row.number, column = %key, value = redact_value(value), "cell");
            }
        }
    }
    Ok(rows)
}

// ============================================================================
// Stages 2-3: Resolve and Validate
// ============================================================================

/// Resolves and validates the batch without touching the store.
pub fn prepare(
    workspace: &Workspace,
    options: &ImportOptions,
    rows: Vec<Row>,
) -> Result<ValidatedBatch> {
    let start = Instant::now();
    let scanned = scan(&workspace.store, options, rows).context("resolve references")?;
    let validated =
        validate(scanned, &workspace.store, &workspace.catalog).context("validate relations")?;
    info!(
        change_sets = validated.change_sets.len(),
        typed_relations = validated.plan.len(),
        duration_ms = start.elapsed().as_millis(),
        "batch prepared"
    );
    Ok(validated)
}

pub fn summarize(input: &Path, batch: &ValidatedBatch, apply: Option<ApplyReport>) -> RunSummary {
    RunSummary {
        input: input.to_path_buf(),
        rows: batch.context.row_count(),
        relation_targets: batch.report.targets,
        relation_edges: batch.report.edges,
        changes: batch.change_sets.iter().map(ChangeSummary::from).collect(),
        apply,
    }
}

// ============================================================================
// Stage 4: Apply
// ============================================================================

/// Applies the batch. On failure the uncommitted tail is aborted, so the
/// store holds exactly the committed checkpoints.
pub fn apply_batch(
    workspace: &mut Workspace,
    batch: &ValidatedBatch,
    options: &ImportOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ApplyReport> {
    let start = Instant::now();
    match apply(batch, &mut workspace.store, &workspace.catalog, options, progress) {
        Ok(report) => {
            info!(
                records = report.records.len(),
                commits = report.commits,
                duration_ms = start.elapsed().as_millis(),
                "apply complete"
            );
            Ok(report)
        }
        Err(error) => {
            if let Err(abort) = workspace.store.abort() {
                warn!(%abort, "abort after failed apply also failed");
            }
            warn!(
                committed = workspace.store.commit_count(),
                "apply failed; uncommitted changes discarded"
            );
            Err(error).context("apply batch")
        }
    }
}

pub fn save_store(path: &Path, workspace: &Workspace) -> Result<()> {
    save_snapshot(path, workspace.store.snapshot())
        .with_context(|| format!("save store {}", path.display()))
}
