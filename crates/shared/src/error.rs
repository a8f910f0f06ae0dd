use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Recoverable failures of grid edits and of decoding a stored table value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("{axis} index {index} is out of range (len {len})")]
    IndexOutOfRange { axis: Axis, index: usize, len: usize },
    #[error("malformed persisted table value: {0}")]
    MalformedPersistedValue(String),
    #[error("the header row cannot be deleted")]
    HeaderRowProtected,
}
