use serde::{Deserialize, Serialize};

use bulkedit_model::RelationshipType;

use crate::store::RelationshipTypeCatalog;

/// Relationship types held in memory, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    types: Vec<RelationshipType>,
}

impl StaticCatalog {
    pub fn new(types: Vec<RelationshipType>) -> Self {
        Self { types }
    }

    pub fn with_type(mut self, relationship_type: RelationshipType) -> Self {
        self.types.push(relationship_type);
        self
    }

    pub fn types(&self) -> &[RelationshipType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl RelationshipTypeCatalog for StaticCatalog {
    fn find_by_role_name(&self, name: &str) -> Vec<&RelationshipType> {
        self.types
            .iter()
            .filter(|relationship_type| relationship_type.has_role(name))
            .collect()
    }
}
