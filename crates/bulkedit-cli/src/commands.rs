use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use tracing::{info, info_span};

use bulkedit_cli::pipeline::{
    apply_batch, load_rows, load_workspace, prepare, resolve_options, save_store, summarize,
};
use bulkedit_cli::progress::BarProgress;
use bulkedit_cli::types::{ReportFile, RunSummary};
use bulkedit_ingest::write_json;
use bulkedit_model::ImportOptions;

use crate::cli::RunArgs;

pub fn run_preview(args: &RunArgs) -> Result<RunSummary> {
    let span = info_span!("preview", input = %args.input.display());
    let _guard = span.enter();

    let options = resolve_options(args.config.as_deref(), &args.overrides())?;
    let workspace = load_workspace(&args.store, &args.catalog)?;
    let rows = load_rows(&args.input, args.content_type.as_deref(), &options)?;
    let batch = prepare(&workspace, &options, rows)?;
    let summary = summarize(&args.input, &batch, None);
    write_report(args, &options, &summary)?;
    Ok(summary)
}

pub fn run_apply(args: &RunArgs) -> Result<RunSummary> {
    let span = info_span!("import", input = %args.input.display());
    let _guard = span.enter();

    let options = resolve_options(args.config.as_deref(), &args.overrides())?;
    let mut workspace = load_workspace(&args.store, &args.catalog)?;
    let rows = load_rows(&args.input, args.content_type.as_deref(), &options)?;
    let batch = prepare(&workspace, &options, rows)?;

    let visible = !args.no_progress && io::stderr().is_terminal();
    let mut progress = BarProgress::new(batch.change_sets.len(), visible);
    let outcome = apply_batch(&mut workspace, &batch, &options, &mut progress);
    progress.finish();

    // Committed checkpoints are kept even when a later one failed.
    save_store(&args.store, &workspace)?;
    let report = outcome?;
    info!(store = %args.store.display(), "store saved");

    let summary = summarize(&args.input, &batch, Some(report));
    write_report(args, &options, &summary)?;
    Ok(summary)
}

fn write_report(args: &RunArgs, options: &ImportOptions, summary: &RunSummary) -> Result<()> {
    let Some(path) = &args.report else {
        return Ok(());
    };
    write_json(path, &ReportFile::new(options, summary))
        .with_context(|| format!("write report {}", path.display()))
}
