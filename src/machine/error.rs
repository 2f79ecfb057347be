//! Interpreter error types.

use super::transition::TableError;
use crate::journal::JournalError;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error raised by rule code inside a transition.
pub type RuleError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while running a workflow.
#[derive(Debug, Error)]
pub enum MachineError {
    /// A frame names a transition the table does not define.
    #[error("Transition {name} is not defined")]
    UndefinedTransition { name: String },

    #[error("Invalid transition table: {}", describe(.0))]
    InvalidTable(Vec<TableError>),

    /// A transition asked to wait without naming anyone to wait for.
    #[error("Transition {name} waited on an empty request list")]
    EmptyWait { name: String },

    #[error("Frame data for {name} must be an object")]
    InvalidFrameData { name: String },

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("Malformed control state: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Corrupt control state: {0}")]
    CorruptControl(String),

    /// Raised by rule code; passed through untouched.
    #[error(transparent)]
    Rule(RuleError),
}

impl MachineError {
    /// Wrap an error raised by rule code.
    pub fn rule(err: impl Into<RuleError>) -> Self {
        Self::Rule(err.into())
    }

    /// Configuration and consistency errors are never worth retrying.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::UndefinedTransition { .. }
            | Self::EmptyWait { .. }
            | Self::InvalidTable(_)
            | Self::CorruptControl(_) => true,
            Self::Journal(err) => err.is_fatal(),
            Self::InvalidFrameData { .. } | Self::Codec(_) | Self::Rule(_) => false,
        }
    }
}

fn describe(errors: &[TableError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
