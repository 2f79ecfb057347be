//! Named transitions and the table that holds them.

use super::context::{Context, Flow};
use super::error::MachineError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Name of the transition every workflow starts from.
pub const ROOT: &str = "root";
/// Name of the sentinel frame marking a finished workflow.
pub const END: &str = "END";

/// Type alias for transition functions.
///
/// A transition is re-entered both to produce a request and to consume the
/// answer, telling the two apart by whether [`Context::response`] is set.
pub type TransitionFn<G> =
    Arc<dyn Fn(&mut Context<'_, G>) -> Result<Flow, MachineError> + Send + Sync>;

/// Problems found when validating a transition table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("No root transition")]
    MissingRoot,

    #[error("Transition names must not be empty")]
    EmptyName,

    #[error("{0} is reserved and cannot be defined")]
    ReservedName(String),
}

/// Mapping from transition name to transition function.
pub struct TransitionTable<G> {
    entries: HashMap<String, TransitionFn<G>>,
}

impl<G> TransitionTable<G> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a transition, replacing any previous one with that name.
    pub fn insert<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&mut Context<'_, G>) -> Result<Flow, MachineError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(action));
    }

    /// Merge another table into this one; its entries win on conflict.
    pub fn extend(&mut self, other: TransitionTable<G>) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, name: &str) -> Option<&TransitionFn<G>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check the table, accumulating every problem found.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<TableError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<TableError>>> = Vec::new();

        checks.push(if self.contains(ROOT) {
            Validation::success(())
        } else {
            Validation::fail(TableError::MissingRoot)
        });

        for name in self.names() {
            if name.is_empty() {
                checks.push(Validation::fail(TableError::EmptyName));
            } else if name == END {
                checks.push(Validation::fail(TableError::ReservedName(name.to_string())));
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// [`validate`](Self::validate), flattened into a plain list of errors.
    pub fn check(&self) -> Result<(), Vec<TableError>> {
        match self.validate() {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}

impl<G> Default for TransitionTable<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> Clone for TransitionTable<G> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<G> fmt::Debug for TransitionTable<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
        Ok(ctx.done())
    }

    #[test]
    fn table_with_root_is_valid() {
        let mut table = TransitionTable::new();
        table.insert(ROOT, noop);
        table.insert("draw", noop);

        assert!(table.validate().is_success());
        assert_eq!(table.names(), vec!["draw", "root"]);
    }

    #[test]
    fn missing_root_is_reported() {
        let mut table = TransitionTable::new();
        table.insert("draw", noop);

        assert_eq!(table.check(), Err(vec![TableError::MissingRoot]));
    }

    #[test]
    fn validation_accumulates_all_errors() {
        let mut table = TransitionTable::new();
        table.insert("", noop);
        table.insert(END, noop);

        let result = table.validate();
        assert!(result.is_failure());
        if let Validation::Failure(errors) = result {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().any(|e| matches!(e, TableError::MissingRoot)));
            assert!(errors.iter().any(|e| matches!(e, TableError::EmptyName)));
            assert!(errors
                .iter()
                .any(|e| matches!(e, TableError::ReservedName(name) if name == END)));
        }
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut table = TransitionTable::new();
        table.insert(ROOT, noop);
        table.insert(ROOT, |ctx: &mut Context<'_, ()>| Ok(ctx.wait_many(Vec::new())));
        assert_eq!(table.len(), 1);
    }
}
