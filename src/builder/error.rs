//! Build errors for the machine builder.

use crate::machine::TableError;
use thiserror::Error;

/// Errors that can occur when building a state machine.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("No transitions defined. Add at least a root transition")]
    NoTransitions,

    #[error("Transition table is invalid: {0:?}")]
    InvalidTable(Vec<TableError>),
}
