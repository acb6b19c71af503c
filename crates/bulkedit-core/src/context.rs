use std::collections::BTreeMap;

use bulkedit_model::{Identifier, RelationEdge, Row, RowNumber};

use crate::graph::RelationGraph;
use crate::index::ReferenceIndex;

/// Mutable state of one batch run.
///
/// Built fresh for every run and threaded through the resolve, validate and
/// apply stages. It is neither `Clone` nor shared: a second run needs a new
/// context.
#[derive(Debug, Default)]
pub struct BatchContext {
    index: ReferenceIndex,
    graph: RelationGraph,
    rows: BTreeMap<RowNumber, Row>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    pub fn record_edge(&mut self, edge: RelationEdge) {
        self.graph.record(edge);
    }

    /// Indexes a scanned row and keeps its raw values.
    pub fn finish_row(&mut self, row: Row, identifier: Identifier) {
        self.index.index_row(&row, identifier);
        self.rows.insert(row.number, row);
    }

    pub fn row(&self, number: RowNumber) -> Option<&Row> {
        self.rows.get(&number)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
