use std::collections::BTreeMap;

use bulkedit_model::{Identifier, RelationEdge};

/// Relation edges expressed by a batch, grouped by target then relation key.
///
/// Edges are never deduplicated: the same origin naming the same target twice
/// is recorded twice.
#[derive(Debug, Default)]
pub struct RelationGraph {
    targets: BTreeMap<Identifier, BTreeMap<String, Vec<Identifier>>>,
    edge_count: usize,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, edge: RelationEdge) {
        self.targets
            .entry(edge.target)
            .or_default()
            .entry(edge.relation_key)
            .or_default()
            .push(edge.origin);
        self.edge_count += 1;
    }

    /// Distinct targets with their origins per relation key.
    pub fn targets(&self) -> impl Iterator<Item = (&Identifier, &BTreeMap<String, Vec<Identifier>>)> {
        self.targets.iter()
    }

    /// Every edge, grouped by target.
    pub fn edges(&self) -> impl Iterator<Item = RelationEdge> + '_ {
        self.targets.iter().flat_map(|(target, keys)| {
            keys.iter().flat_map(move |(relation_key, origins)| {
                origins.iter().map(move |origin| RelationEdge {
                    target: *target,
                    relation_key: relation_key.clone(),
                    origin: *origin,
                })
            })
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}

#[cfg(test)]
mod tests {
    use bulkedit_model::{RecordId, RowNumber};

    use super::*;

    #[test]
    fn keeps_multiplicities() {
        let mut graph = RelationGraph::new();
        let target = Identifier::Persisted(RecordId::new_v4());
        let origin = Identifier::Placeholder(RowNumber::FIRST);
        for _ in 0..2 {
            graph.record(RelationEdge {
                target,
                relation_key: "relation.isAuthorOfPublication".to_string(),
                origin,
            });
        }
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.targets().count(), 1);
        assert_eq!(graph.edges().count(), 2);
    }
}
