use std::collections::BTreeMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use bulkedit_apply::RecordOutcome;
use bulkedit_cli::types::{ChangeSummary, RunSummary};
use bulkedit_model::{LifecycleAction, RecordId, RowNumber};

pub fn print_summary(summary: &RunSummary) {
    println!("Input: {}", summary.input.display());
    println!(
        "Rows: {}  Change sets: {}  New records: {}  Relations: {} edges to {} targets",
        summary.rows,
        summary.changes.len(),
        summary.new_records(),
        summary.relation_edges,
        summary.relation_targets
    );
    if summary.is_dry_run() {
        println!("Preview only: nothing was written.");
    }
    if summary.changes.is_empty() {
        println!("No changes.");
        return;
    }

    let outcomes = outcomes_by_row(summary);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Row"),
        header_cell("Target"),
        header_cell("Row name"),
        header_cell("Adds"),
        header_cell("Removes"),
        header_cell("Kept"),
        header_cell("Containers"),
        header_cell("Action"),
        header_cell("Outcome"),
    ]);
    apply_table_style(&mut table);
    for column in 3..=6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    align_column(&mut table, 8, CellAlignment::Center);

    for change in &summary.changes {
        let outcome = outcomes.get(&change.row).copied();
        table.add_row(vec![
            Cell::new(change.row),
            target_cell(change, outcome),
            Cell::new(change.row_name.as_deref().unwrap_or("-")),
            count_cell(change.adds, Color::Green),
            count_cell(change.removes, Color::Red),
            dim_cell(change.kept),
            count_cell(change.container_changes, Color::Yellow),
            Cell::new(change.action.map_or("-", LifecycleAction::token)),
            outcome_cell(outcome.map(|(outcome, _)| outcome)),
        ]);
    }
    println!("{table}");

    if let Some(report) = &summary.apply {
        let counts: Vec<String> = report
            .outcome_counts()
            .into_iter()
            .map(|(outcome, count)| format!("{outcome}: {count}"))
            .collect();
        println!("Commits: {}  {}", report.commits, counts.join("  "));
    }
}

fn outcomes_by_row(summary: &RunSummary) -> BTreeMap<RowNumber, (RecordOutcome, RecordId)> {
    summary
        .apply
        .iter()
        .flat_map(|report| &report.records)
        .map(|record| (record.row, (record.outcome, record.record)))
        .collect()
}

fn target_cell(change: &ChangeSummary, outcome: Option<(RecordOutcome, RecordId)>) -> Cell {
    match outcome {
        Some((_, record)) if change.is_new => Cell::new(record).fg(Color::Green),
        _ if change.is_new => Cell::new("new").fg(Color::Green),
        _ => Cell::new(change.target),
    }
}

fn outcome_cell(outcome: Option<RecordOutcome>) -> Cell {
    match outcome {
        Some(RecordOutcome::Created) => Cell::new("created").fg(Color::Green),
        Some(RecordOutcome::Deleted) => Cell::new("deleted")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Some(RecordOutcome::Unchanged) => dim_cell("unchanged"),
        Some(outcome) => Cell::new(outcome).fg(Color::Yellow),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
