//! Journal error types.

use crate::core::{NodeId, PathError};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by journal operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JournalError {
    #[error(transparent)]
    Path(#[from] PathError),

    /// The recorded `old` value does not match the live tree. The log and the
    /// tree have diverged; nothing was mutated and no repair is attempted.
    #[error("Journal desync at {location}: expected {expected}, found {found:?}")]
    Desync {
        location: String,
        expected: Value,
        found: Option<Value>,
    },

    #[error("Null values cannot be written by {op}")]
    NullValue { op: &'static str },

    #[error("Key '{key}' does not exist. Use add_key to introduce it")]
    MissingKey { key: String },

    #[error("Key '{key}' cannot be addressed by a path")]
    InvalidKey { key: String },

    #[error("Key '{key}' is reserved at the root")]
    ReservedKey { key: String },

    #[error("Game state must be a JSON object")]
    NotAnObject,

    #[error("Node {0} is not a map")]
    NotAMap(NodeId),

    #[error("Node {0} is not a list")]
    NotAList(NodeId),

    #[error("Index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Value at '{key}' is not an integer")]
    NotAnInteger { key: String },

    #[error("Node {0} is not an element of a list")]
    NotInList(NodeId),

    #[error("Cannot move node {0} into its own subtree")]
    MoveIntoSelf(NodeId),
}

impl JournalError {
    /// Whether the error means the log and tree can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Desync { .. })
    }
}
