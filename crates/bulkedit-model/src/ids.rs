use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ModelError;

/// Globally unique identifier of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ModelError::InvalidRecordId {
                value: value.to_string(),
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a container (collection) records live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(Uuid);

impl ContainerId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 1-based position of a row within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowNumber(usize);

impl RowNumber {
    pub const FIRST: RowNumber = RowNumber(1);

    /// Returns `None` for 0; row numbers start at 1.
    pub fn new(value: usize) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RowNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a record within one batch.
///
/// Rows that describe new records have no persisted id until the apply stage
/// creates them, so they are addressed by a placeholder derived from their
/// row number. The two variants never compare equal, which rules out any
/// collision between a placeholder and a real id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    Persisted(RecordId),
    Placeholder(RowNumber),
}

impl Identifier {
    pub fn persisted(&self) -> Option<RecordId> {
        match self {
            Identifier::Persisted(id) => Some(*id),
            Identifier::Placeholder(_) => None,
        }
    }

    pub fn placeholder_row(&self) -> Option<RowNumber> {
        match self {
            Identifier::Persisted(_) => None,
            Identifier::Placeholder(row) => Some(*row),
        }
    }
}

impl From<RecordId> for Identifier {
    fn from(id: RecordId) -> Self {
        Identifier::Persisted(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Persisted(id) => id.fmt(f),
            Identifier::Placeholder(row) => write!(f, "placeholder:{row}"),
        }
    }
}
