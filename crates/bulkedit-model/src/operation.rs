use serde::{Deserialize, Serialize};

use crate::{FieldKey, Identifier};

/// Confidence of a value that carries no authority.
pub const CONFIDENCE_UNSET: i32 = -1;
/// Confidence of an accepted authority value.
pub const CONFIDENCE_ACCEPTED: i32 = 600;

/// A single metadata value, optionally authority-controlled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub field: FieldKey,
    pub value: String,
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default = "unset_confidence")]
    pub confidence: i32,
    /// Resolved target of a relation value.
    #[serde(default)]
    pub target: Option<Identifier>,
}

fn unset_confidence() -> i32 {
    CONFIDENCE_UNSET
}

impl MetadataValue {
    pub fn plain(field: FieldKey, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            authority: None,
            confidence: CONFIDENCE_UNSET,
            target: None,
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>, confidence: i32) -> Self {
        self.authority = Some(authority.into());
        self.confidence = confidence;
        self
    }

    pub fn with_target(mut self, target: Identifier) -> Self {
        self.target = Some(target);
        self
    }

    /// Parses `value<SEP>authority<SEP>confidence`.
    ///
    /// The value part may itself contain the separator. When there are fewer
    /// than three parts, or the last part is not an integer confidence, the
    /// whole string is taken as a plain value.
    pub fn parse_with_authority(field: FieldKey, raw: &str, separator: &str) -> Self {
        if separator.is_empty() || !raw.contains(separator) {
            return Self::plain(field, raw);
        }
        let parts: Vec<&str> = raw.split(separator).collect();
        if parts.len() < 3 {
            return Self::plain(field, raw);
        }
        let Ok(confidence) = parts[parts.len() - 1].trim().parse::<i32>() else {
            return Self::plain(field, raw);
        };
        let authority = parts[parts.len() - 2];
        let value = parts[..parts.len() - 2].join(separator);
        Self::plain(field, value).with_authority(authority, confidence)
    }

    /// Renders the value the way it is compared against row input.
    pub fn render(&self, separator: &str) -> String {
        match &self.authority {
            Some(authority) => {
                let confidence = if self.confidence == CONFIDENCE_UNSET {
                    CONFIDENCE_ACCEPTED
                } else {
                    self.confidence
                };
                format!("{}{separator}{authority}{separator}{confidence}", self.value)
            }
            None => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Remove,
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum MetadataOperation {
    Add(MetadataValue),
    Remove(MetadataValue),
    Constant(MetadataValue),
}

impl MetadataOperation {
    pub fn value(&self) -> &MetadataValue {
        match self {
            MetadataOperation::Add(value)
            | MetadataOperation::Remove(value)
            | MetadataOperation::Constant(value) => value,
        }
    }

    pub fn field(&self) -> &FieldKey {
        &self.value().field
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            MetadataOperation::Add(_) => OperationKind::Add,
            MetadataOperation::Remove(_) => OperationKind::Remove,
            MetadataOperation::Constant(_) => OperationKind::Constant,
        }
    }

    /// Add or Remove.
    pub fn is_change(&self) -> bool {
        !matches!(self, MetadataOperation::Constant(_))
    }
}
