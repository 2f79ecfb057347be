//! Builder API for ergonomic state machine construction.
//!
//! This module provides a fluent builder and a macro for assembling a
//! transition table with minimal boilerplate. Validation happens once, in
//! [`MachineBuilder::build`].

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;
