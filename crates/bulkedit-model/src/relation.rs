//! Relationship types and the relation edges expressed by a batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Identifier, RowNumber};

/// One resolved relation reference: `origin` names `target` under `relation_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub target: Identifier,
    pub relation_key: String,
    pub origin: Identifier,
}

/// Base role name of a relation column key (`relation.isAuthorOf` -> `isAuthorOf`).
pub fn relation_base_name(relation_key: &str) -> &str {
    let mut parts = relation_key.split('.');
    match (parts.next(), parts.next()) {
        (Some(_), Some(element)) => element.split('[').next().unwrap_or(element),
        _ => relation_key,
    }
}

/// Which side of a relationship type the origin record sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
    OriginIsLeft,
    OriginIsRight,
}

/// Declared pairing of two entity types with named roles.
///
/// A record of `left_type` refers to its partner under `leftward_name`; a
/// record of `right_type` refers to its partner under `rightward_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: u32,
    pub left_type: String,
    pub right_type: String,
    pub leftward_name: String,
    pub rightward_name: String,
}

impl RelationshipType {
    pub fn has_role(&self, name: &str) -> bool {
        self.leftward_name.eq_ignore_ascii_case(name) || self.rightward_name.eq_ignore_ascii_case(name)
    }

    /// Checks whether an origin of `origin_type` may refer to a target of
    /// `target_type` through `relation_key`, and on which side the origin sits.
    pub fn orient(
        &self,
        origin_type: &str,
        target_type: &str,
        relation_key: &str,
    ) -> Option<RelationDirection> {
        let name = relation_base_name(relation_key);
        if self.leftward_name.eq_ignore_ascii_case(name)
            && self.left_type.eq_ignore_ascii_case(origin_type)
            && self.right_type.eq_ignore_ascii_case(target_type)
        {
            return Some(RelationDirection::OriginIsLeft);
        }
        if self.rightward_name.eq_ignore_ascii_case(name)
            && self.left_type.eq_ignore_ascii_case(target_type)
            && self.right_type.eq_ignore_ascii_case(origin_type)
        {
            return Some(RelationDirection::OriginIsRight);
        }
        None
    }
}

/// A single problem found while validating the batch relation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationDiagnostic {
    UnresolvedTargetType {
        target: Identifier,
        /// Rows whose relation columns name the target.
        referenced_by: Vec<RowNumber>,
    },
    UnresolvedOriginType {
        row: Option<RowNumber>,
        relation_key: String,
        origin: Identifier,
    },
    TypeMismatch {
        row: Option<RowNumber>,
        relation_key: String,
        target_type: String,
        origin_type: String,
    },
}

impl RelationDiagnostic {
    pub fn row(&self) -> Option<RowNumber> {
        match self {
            RelationDiagnostic::UnresolvedTargetType { referenced_by, .. } => {
                referenced_by.first().copied()
            }
            RelationDiagnostic::UnresolvedOriginType { row, .. }
            | RelationDiagnostic::TypeMismatch { row, .. } => *row,
        }
    }
}

struct RowLabel(Option<RowNumber>);

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(row) => write!(f, "row {row}"),
            None => f.write_str("row N/A"),
        }
    }
}

impl fmt::Display for RelationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationDiagnostic::UnresolvedTargetType {
                target,
                referenced_by,
            } => {
                let rows = referenced_by
                    .iter()
                    .map(RowNumber::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                match referenced_by.len() {
                    0 => write!(f, "row N/A: cannot resolve entity type for target {target}"),
                    1 => write!(f, "row {rows}: cannot resolve entity type for target {target}"),
                    _ => write!(f, "rows {rows}: cannot resolve entity type for target {target}"),
                }
            }
            RelationDiagnostic::UnresolvedOriginType {
                row,
                relation_key,
                origin,
            } => write!(
                f,
                "{}: cannot resolve entity type for origin {origin} of {relation_key}",
                RowLabel(*row)
            ),
            RelationDiagnostic::TypeMismatch {
                row,
                relation_key,
                target_type,
                origin_type,
            } => write!(
                f,
                "{}: no relationship type for {relation_key} from origin type {origin_type} to target type {target_type}",
                RowLabel(*row)
            ),
        }
    }
}
