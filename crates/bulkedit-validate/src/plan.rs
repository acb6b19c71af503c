use std::collections::BTreeMap;

use serde::Serialize;

use bulkedit_model::{Identifier, RelationDiagnostic, RelationDirection};

/// Relationship type chosen for one (origin, relation key, target) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedRelation {
    pub type_id: u32,
    pub direction: RelationDirection,
}

/// Typed relations that passed validation, consumed by the apply stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationPlan {
    entries: BTreeMap<(Identifier, String, Identifier), PlannedRelation>,
}

impl RelationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        origin: Identifier,
        relation_key: &str,
        target: Identifier,
        planned: PlannedRelation,
    ) {
        self.entries
            .insert((origin, relation_key.to_string(), target), planned);
    }

    pub fn get(
        &self,
        origin: Identifier,
        relation_key: &str,
        target: Identifier,
    ) -> Option<PlannedRelation> {
        self.entries
            .get(&(origin, relation_key.to_string(), target))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of validating the batch relation graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationReport {
    pub targets: usize,
    pub edges: usize,
    pub diagnostics: Vec<RelationDiagnostic>,
}

impl RelationReport {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }
}
