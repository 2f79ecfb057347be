//! Pure data layer: the state tree, paths into it, and diff records.
//!
//! - [`Tree`] stores a session as an arena of maps, lists and scalars
//! - [`Path`] and [`Key`] turn node handles into serializable addresses
//! - [`Diff`] describes one reversible edit
//!
//! Nothing in this module records history. All recorded mutation goes
//! through [`crate::journal::Journal`].

mod diff;
mod path;
mod tree;

pub use diff::Diff;
pub use path::{Key, Path, PathError};
pub use tree::{NodeId, NodeKind, Tree};
