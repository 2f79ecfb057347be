//! The workflow interpreter.
//!
//! Game logic is written as a table of named transitions. Each transition is
//! a function from a [`Context`] to a [`Flow`] telling the interpreter what to
//! do next: call a child transition, return to the parent, or suspend until an
//! actor answers.
//!
//! # Key Concepts
//!
//! - **Frames**: `{ name, data }` records on a call stack kept in the state tree
//! - **Waiting**: requests for actor input; non-empty exactly while suspended
//! - **Response**: the driver's answer, seen by the suspended transition on
//!   its next invocation
//! - **Terminal**: once an `END` frame is on top, `run` is a no-op
//!
//! # Example
//!
//! ```rust
//! use turnkeeper::journal::{GameState, Journal};
//! use turnkeeper::machine::{
//!     Context, Flow, MachineError, MachineOptions, MachineStatus, StateMachine,
//!     TransitionTable, WaitRequest,
//! };
//! use serde_json::json;
//!
//! fn root(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
//!     match ctx.response().cloned() {
//!         None => Ok(ctx.wait(WaitRequest::new("p1").with_options(["x", "y"]))),
//!         Some(choice) => {
//!             ctx.set("choice", choice)?;
//!             Ok(ctx.push("END", json!({})))
//!         }
//!     }
//! }
//!
//! let mut table = TransitionTable::new();
//! table.insert("root", root);
//! let machine = StateMachine::new(table, MachineOptions::default()).unwrap();
//!
//! let mut journal = Journal::new(GameState::from_value(json!({})).unwrap());
//! assert_eq!(machine.run(&mut journal, &mut ()).unwrap(), MachineStatus::Suspended);
//!
//! machine.respond(&mut journal, "y").unwrap();
//! assert_eq!(machine.run(&mut journal, &mut ()).unwrap(), MachineStatus::Terminal);
//! ```

mod context;
mod error;
mod interpreter;
mod options;
mod transition;

pub use context::{Context, Flow, WaitRequest};
pub use error::{MachineError, RuleError};
pub use interpreter::{MachineStatus, StateMachine};
pub use options::{MachineOptions, PushHook};
pub use transition::{TableError, TransitionFn, TransitionTable, END, ROOT};
