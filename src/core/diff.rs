//! Reversible edit records.

use super::path::{Key, Path};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recorded edit to the state tree.
///
/// Diffs are self-describing: they carry both the value found before the
/// edit (`old`) and the value written (`new`), so every data-carrying diff can
/// be inverted with [`Diff::reverse`]. They serialize with a `kind` tag
/// (`put`, `splice`, `addKey`, `removeKey`, `checkpoint`).
///
/// # Example
///
/// ```rust
/// use turnkeeper::core::{Diff, Key, Path};
/// use serde_json::json;
///
/// let diff = Diff::Put {
///     path: ".players[0]".parse().unwrap(),
///     key: Key::from("score"),
///     old: json!(3),
///     new: json!(4),
/// };
///
/// let undo = diff.reverse().unwrap();
/// assert_eq!(undo.reverse().unwrap(), diff);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diff {
    /// Overwrite the value of an existing key or list position.
    Put {
        path: Path,
        key: Key,
        old: Value,
        new: Value,
    },

    /// Replace a contiguous run of list elements starting at `key`.
    Splice {
        path: Path,
        key: usize,
        old: Vec<Value>,
        new: Vec<Value>,
    },

    /// Introduce a map key that did not exist.
    AddKey { path: Path, key: String, new: Value },

    /// Delete an existing map key.
    RemoveKey { path: Path, key: String, old: Value },

    /// Non-mutating marker used as an undo boundary.
    Checkpoint { name: String },
}

impl Diff {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Put { .. } => "put",
            Self::Splice { .. } => "splice",
            Self::AddKey { .. } => "addKey",
            Self::RemoveKey { .. } => "removeKey",
            Self::Checkpoint { .. } => "checkpoint",
        }
    }

    /// Path of the container this diff edits; `None` for checkpoints.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Put { path, .. }
            | Self::Splice { path, .. }
            | Self::AddKey { path, .. }
            | Self::RemoveKey { path, .. } => Some(path),
            Self::Checkpoint { .. } => None,
        }
    }

    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Self::Checkpoint { .. })
    }

    /// Whether this is a checkpoint with the given name.
    pub fn is_checkpoint_named(&self, name: &str) -> bool {
        matches!(self, Self::Checkpoint { name: own } if own == name)
    }

    /// The structurally inverse diff.
    ///
    /// Checkpoints have no inverse and return `None`.
    pub fn reverse(&self) -> Option<Self> {
        Some(match self {
            Self::Put {
                path,
                key,
                old,
                new,
            } => Self::Put {
                path: path.clone(),
                key: key.clone(),
                old: new.clone(),
                new: old.clone(),
            },
            Self::Splice {
                path,
                key,
                old,
                new,
            } => Self::Splice {
                path: path.clone(),
                key: *key,
                old: new.clone(),
                new: old.clone(),
            },
            Self::AddKey { path, key, new } => Self::RemoveKey {
                path: path.clone(),
                key: key.clone(),
                old: new.clone(),
            },
            Self::RemoveKey { path, key, old } => Self::AddKey {
                path: path.clone(),
                key: key.clone(),
                new: old.clone(),
            },
            Self::Checkpoint { .. } => return None,
        })
    }
}
