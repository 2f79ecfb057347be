//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::machine::{Context, Flow, MachineError, MachineOptions, StateMachine, TransitionTable};
use serde_json::Value;

/// Builder for constructing state machines with a fluent API.
pub struct MachineBuilder<G> {
    transitions: TransitionTable<G>,
    options: MachineOptions,
}

impl<G> MachineBuilder<G> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            transitions: TransitionTable::new(),
            options: MachineOptions::default(),
        }
    }

    /// Add a named transition.
    pub fn transition<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Context<'_, G>) -> Result<Flow, MachineError> + Send + Sync + 'static,
    {
        self.transitions.insert(name, action);
        self
    }

    /// Add every transition of an existing table.
    pub fn transitions(mut self, table: TransitionTable<G>) -> Self {
        self.transitions.extend(table);
        self
    }

    /// Replace all options at once.
    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    /// Copy `key` from parent frame data into child frames that lack it.
    pub fn inherit_key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.inherit_key(key);
        self
    }

    /// Observe every frame push.
    pub fn on_push<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.options = self.options.on_push(hook);
        self
    }

    /// Build the state machine.
    /// Returns an error if the table is empty or fails validation.
    pub fn build(self) -> Result<StateMachine<G>, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }
        self.transitions.check().map_err(BuildError::InvalidTable)?;

        Ok(StateMachine::from_checked(self.transitions, self.options))
    }
}

impl<G> Default for MachineBuilder<G> {
    fn default() -> Self {
        Self::new()
    }
}
