//! Turnkeeper: a journaled game-state engine with a suspendable workflow interpreter
//!
//! Turnkeeper keeps a whole game session in one JSON-shaped tree and routes
//! every mutation through a journal, so any step can be undone and the full
//! session persisted as plain JSON. Game logic runs on a stack-based
//! interpreter whose call stack lives in that same tree: it can stop to wait
//! for a player, be saved and reloaded, and pick up exactly where it left off.
//!
//! # Core Concepts
//!
//! - **Tree**: arena of maps, lists and scalars addressed by [`NodeId`](core::NodeId)
//! - **Diff**: one reversible mutation; the history is a list of them
//! - **Journal**: validates, applies and records diffs; undoes and redoes them
//! - **Machine**: runs named transitions over the tree until it must wait
//!
//! # Example
//!
//! ```rust
//! use turnkeeper::transitions;
//! use turnkeeper::journal::{GameState, Journal};
//! use turnkeeper::machine::{Context, Flow, MachineError, MachineStatus, WaitRequest};
//! use serde_json::json;
//!
//! fn root(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
//!     if let Some(score) = ctx.returned() {
//!         ctx.set("final", score)?;
//!         return Ok(ctx.push("END", json!({})));
//!     }
//!     Ok(ctx.push("turn", json!({"player": "p1"})))
//! }
//!
//! fn turn(ctx: &mut Context<'_, ()>) -> Result<Flow, MachineError> {
//!     match ctx.response().cloned() {
//!         None => Ok(ctx.wait(WaitRequest::new("p1").with_options([1, 2, 3]))),
//!         Some(pick) => Ok(ctx.return_value(pick)),
//!     }
//! }
//!
//! let machine = transitions! { "root" => root, "turn" => turn }.build().unwrap();
//! let mut journal = Journal::new(GameState::from_value(json!({})).unwrap());
//!
//! assert_eq!(machine.run(&mut journal, &mut ()).unwrap(), MachineStatus::Suspended);
//! machine.respond(&mut journal, 2).unwrap();
//! assert_eq!(machine.run(&mut journal, &mut ()).unwrap(), MachineStatus::Terminal);
//! ```

pub mod builder;
pub mod core;
pub mod journal;
pub mod machine;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use core::{Diff, Key, NodeId, Path, Tree};
pub use journal::{GameState, Journal, JournalError};
pub use machine::{Context, Flow, MachineError, MachineStatus, StateMachine, WaitRequest};
pub use snapshot::{Snapshot, SnapshotError};
