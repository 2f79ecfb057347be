//! The record keeper: the only way to mutate a game state.
//!
//! Every mutation is turned into a [`Diff`], checked against the live tree,
//! applied, and appended to the history log stored in the [`GameState`].
//! Because each diff carries the value it replaced, the log can be walked
//! backwards to undo any number of steps, or back to a named checkpoint.
//!
//! # Example
//!
//! ```rust
//! use turnkeeper::journal::{GameState, Journal};
//! use serde_json::json;
//!
//! let state = GameState::from_value(json!({"deck": [1, 2, 3], "score": 0})).unwrap();
//! let mut journal = Journal::new(state);
//!
//! let root = journal.tree().root();
//! let deck = journal.tree().get(root, "deck").unwrap();
//!
//! journal.checkpoint("draw").unwrap();
//! journal.pop(deck).unwrap();
//! journal.increment(root, "score").unwrap();
//! assert_eq!(journal.history().len(), 3);
//!
//! journal.undo_to("draw").unwrap();
//! assert_eq!(journal.tree().value(root).unwrap()["deck"], json!([1, 2, 3]));
//! assert!(journal.history().is_empty());
//! ```

pub mod error;
pub mod state;

pub use error::JournalError;
pub use state::{GameState, HISTORY_KEY, RESPONSE_KEY, STACK_KEY, WAITING_KEY};

use state::check_keys;

use crate::core::{Diff, Key, NodeId, NodeKind, Path, Tree};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Records, applies and reverses diffs against one [`GameState`].
///
/// The redo stack lives only in memory. It is not part of the persisted
/// state and is lost when the journal is dropped or reloaded.
#[derive(Debug, Default)]
pub struct Journal {
    state: GameState,
    undone: Vec<Diff>,
}

impl Journal {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            undone: Vec::new(),
        }
    }

    /// Swap in a different state, discarding the redo stack.
    pub fn load(&mut self, state: GameState) {
        self.state = state;
        self.undone.clear();
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn tree(&self) -> &Tree {
        &self.state.tree
    }

    pub fn history(&self) -> &[Diff] {
        &self.state.history
    }

    pub fn can_undo(&self) -> bool {
        !self.state.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn path(&self, target: NodeId) -> Result<Path, JournalError> {
        Ok(self.tree().path(target)?)
    }

    pub fn at(&self, path: &Path) -> Result<NodeId, JournalError> {
        Ok(self.tree().at(path)?)
    }

    pub fn locate(&self, target: NodeId) -> Result<(Path, Key), JournalError> {
        Ok(self.tree().locate(target)?)
    }

    // Primitive operations

    /// Overwrite the value under an existing key or list index.
    ///
    /// Writing a value structurally equal to the current one records nothing.
    pub fn put(
        &mut self,
        container: NodeId,
        key: impl Into<Key>,
        value: impl Into<Value>,
    ) -> Result<(), JournalError> {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            return Err(JournalError::NullValue { op: "put" });
        }
        check_keys(&value)?;

        let tree = self.tree();
        let current = tree
            .child(container, &key)
            .and_then(|child| tree.value(child))
            .ok_or_else(|| JournalError::MissingKey {
                key: key.to_string(),
            })?;
        if current == value {
            return Ok(());
        }

        let path = tree.path(container)?;
        self.commit(Diff::Put {
            path,
            key,
            old: current,
            new: value,
        })
    }

    /// Introduce a new map key.
    ///
    /// An existing key is overwritten through [`put`](Self::put), so undo
    /// restores its previous value.
    pub fn add_key(
        &mut self,
        map: NodeId,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), JournalError> {
        let value = value.into();
        if value.is_null() {
            return Err(JournalError::NullValue { op: "add_key" });
        }
        if !Key::from(key).is_addressable() {
            return Err(JournalError::InvalidKey {
                key: key.to_string(),
            });
        }
        if map == self.tree().root() && key == HISTORY_KEY {
            return Err(JournalError::ReservedKey {
                key: key.to_string(),
            });
        }
        if self.tree().kind(map) != Some(NodeKind::Map) {
            return Err(JournalError::NotAMap(map));
        }
        check_keys(&value)?;
        if self.tree().contains_key(map, key) {
            debug!(key, "add_key on an existing key, recording a put");
            return self.put(map, key, value);
        }

        let path = self.tree().path(map)?;
        self.commit(Diff::AddKey {
            path,
            key: key.to_string(),
            new: value,
        })
    }

    /// Delete an existing map key, recording its value for reversal.
    pub fn remove_key(&mut self, map: NodeId, key: &str) -> Result<(), JournalError> {
        let tree = self.tree();
        if tree.kind(map) != Some(NodeKind::Map) {
            return Err(JournalError::NotAMap(map));
        }
        let old = tree
            .get(map, key)
            .and_then(|child| tree.value(child))
            .ok_or_else(|| JournalError::MissingKey {
                key: key.to_string(),
            })?;

        let path = tree.path(map)?;
        self.commit(Diff::RemoveKey {
            path,
            key: key.to_string(),
            old,
        })
    }

    /// Replace `remove` elements of `list` starting at `index` with `items`.
    ///
    /// `remove` is clamped to the end of the list. When the covered run
    /// already equals `items` nothing is recorded. Returns the covered run.
    pub fn splice(
        &mut self,
        list: NodeId,
        index: usize,
        remove: usize,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, JournalError> {
        let tree = self.tree();
        if tree.kind(list) != Some(NodeKind::List) {
            return Err(JournalError::NotAList(list));
        }
        let children = tree.children(list);
        if index > children.len() {
            return Err(JournalError::IndexOutOfBounds {
                index,
                len: children.len(),
            });
        }

        let end = index.saturating_add(remove).min(children.len());
        let old = children[index..end]
            .iter()
            .filter_map(|child| tree.value(*child))
            .collect::<Vec<_>>();
        if old == items {
            return Ok(old);
        }
        if items.iter().any(contains_null) {
            return Err(JournalError::NullValue { op: "splice" });
        }
        items.iter().try_for_each(check_keys)?;

        let path = tree.path(list)?;
        self.commit(Diff::Splice {
            path,
            key: index,
            old: old.clone(),
            new: items,
        })?;
        Ok(old)
    }

    /// Record a named undo boundary.
    pub fn checkpoint(&mut self, name: impl Into<String>) -> Result<(), JournalError> {
        self.commit(Diff::Checkpoint { name: name.into() })
    }

    // Derived helpers

    /// Append to a list, returning the new element's handle.
    pub fn push(&mut self, list: NodeId, value: impl Into<Value>) -> Result<NodeId, JournalError> {
        let len = self.list_len(list)?;
        self.splice(list, len, 0, vec![value.into()])?;
        self.tree()
            .get_index(list, len)
            .ok_or(JournalError::NotAList(list))
    }

    /// Remove and return the last element of a list.
    pub fn pop(&mut self, list: NodeId) -> Result<Option<Value>, JournalError> {
        let len = self.list_len(list)?;
        if len == 0 {
            return Ok(None);
        }
        Ok(self.splice(list, len - 1, 1, Vec::new())?.pop())
    }

    /// Append unless a structurally equal element is already present.
    ///
    /// Returns whether the value was appended.
    pub fn push_unique(&mut self, list: NodeId, value: impl Into<Value>) -> Result<bool, JournalError> {
        let value = value.into();
        let tree = self.tree();
        if tree.kind(list) != Some(NodeKind::List) {
            return Err(JournalError::NotAList(list));
        }
        let present = tree
            .children(list)
            .into_iter()
            .any(|child| tree.value(child).as_ref() == Some(&value));
        if present {
            return Ok(false);
        }
        self.push(list, value)?;
        Ok(true)
    }

    /// Add one to an integer value, returning the new value.
    pub fn increment(&mut self, container: NodeId, key: impl Into<Key>) -> Result<i64, JournalError> {
        let key = key.into();
        let tree = self.tree();
        let current = tree
            .child(container, &key)
            .and_then(|child| tree.value(child))
            .ok_or_else(|| JournalError::MissingKey {
                key: key.to_string(),
            })?;
        let next = current
            .as_i64()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| JournalError::NotAnInteger {
                key: key.to_string(),
            })?;
        self.put(container, key, next)?;
        Ok(next)
    }

    /// Move a list element into `dest` at `index` (default: the end).
    ///
    /// Recorded as two splices, out of the source and into the destination.
    /// The destination index is clamped to the destination's length after
    /// removal. Returns the handle of the element at its new position; the
    /// old handle is stale afterwards.
    pub fn move_item(
        &mut self,
        item: NodeId,
        dest: NodeId,
        index: Option<usize>,
    ) -> Result<NodeId, JournalError> {
        let dest_len = self.list_len(dest)?;
        let (source_path, key) = self.locate(item)?;
        let source_index = key.as_index().ok_or(JournalError::NotInList(item))?;
        let item_path = source_path.child(source_index);
        if self.path(dest)?.starts_with(&item_path) {
            return Err(JournalError::MoveIntoSelf(item));
        }

        let source = self.at(&source_path)?;
        let value = self
            .tree()
            .value(item)
            .ok_or(JournalError::NotInList(item))?;
        let target = index.unwrap_or(dest_len);

        self.splice(source, source_index, 1, Vec::new())?;
        let target = target.min(self.list_len(dest)?);
        self.splice(dest, target, 0, vec![value])?;

        self.tree()
            .get_index(dest, target)
            .ok_or(JournalError::NotAList(dest))
    }

    /// Overwrite `item` in whatever container holds it.
    ///
    /// Returns the handle now stored at that position.
    pub fn replace(&mut self, item: NodeId, value: impl Into<Value>) -> Result<NodeId, JournalError> {
        let (path, key) = self.locate(item)?;
        let container = self.at(&path)?;
        self.put(container, key.clone(), value)?;
        self.tree()
            .child(container, &key)
            .ok_or_else(|| JournalError::MissingKey {
                key: key.to_string(),
            })
    }

    // Applying and reversing

    /// Apply a diff and append it to the history.
    pub fn patch(&mut self, diff: Diff) -> Result<(), JournalError> {
        self.apply(&diff)?;
        trace!(kind = diff.kind(), "recorded diff");
        self.state.history.push(diff);
        Ok(())
    }

    /// Apply a diff without recording it.
    pub fn patch_unrecorded(&mut self, diff: &Diff) -> Result<(), JournalError> {
        self.apply(diff)
    }

    /// Apply the inverse of `diff` without recording it.
    ///
    /// Checkpoints have no inverse; reversing one is a no-op.
    pub fn reverse(&mut self, diff: &Diff) -> Result<(), JournalError> {
        match diff.reverse() {
            Some(reversed) => self.apply(&reversed),
            None => Ok(()),
        }
    }

    /// Undo the most recent diff.
    ///
    /// Returns `false` when the history is already empty.
    pub fn undo(&mut self) -> Result<bool, JournalError> {
        let Some(diff) = self.state.history.pop() else {
            return Ok(false);
        };
        if let Err(err) = self.reverse(&diff) {
            self.state.history.push(diff);
            return Err(err);
        }
        debug!(kind = diff.kind(), remaining = self.state.history.len(), "undid diff");
        self.undone.push(diff);
        Ok(true)
    }

    /// Undo diffs until the checkpoint named `name` has been removed.
    ///
    /// Returns how many diffs were undone, the checkpoint included. When no
    /// checkpoint of that name is in the history nothing is undone.
    pub fn undo_to(&mut self, name: &str) -> Result<usize, JournalError> {
        if !self.state.history.iter().any(|diff| diff.is_checkpoint_named(name)) {
            warn!(checkpoint = name, "no such checkpoint, nothing undone");
            return Ok(0);
        }

        let mut count = 0;
        while let Some(last) = self.state.history.last() {
            let reached = last.is_checkpoint_named(name);
            self.undo()?;
            count += 1;
            if reached {
                break;
            }
        }
        debug!(checkpoint = name, count, "undid to checkpoint");
        Ok(count)
    }

    /// Re-apply the most recently undone diff, recording it again.
    ///
    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, JournalError> {
        let Some(diff) = self.undone.pop() else {
            return Ok(false);
        };
        if let Err(err) = self.apply(&diff) {
            self.undone.push(diff);
            return Err(err);
        }
        debug!(kind = diff.kind(), "redid diff");
        self.state.history.push(diff);
        Ok(true)
    }

    /// Record a fresh mutation. The redo stack no longer describes the live
    /// tree once it diverges, so it is dropped.
    fn commit(&mut self, diff: Diff) -> Result<(), JournalError> {
        self.patch(diff)?;
        self.undone.clear();
        Ok(())
    }

    fn list_len(&self, list: NodeId) -> Result<usize, JournalError> {
        match self.tree().kind(list) {
            Some(NodeKind::List) => Ok(self.tree().len(list).unwrap_or(0)),
            _ => Err(JournalError::NotAList(list)),
        }
    }

    /// Check a diff against the live tree, then mutate. Every check runs
    /// before the first write.
    fn apply(&mut self, diff: &Diff) -> Result<(), JournalError> {
        let tree = &mut self.state.tree;
        match diff {
            Diff::Checkpoint { .. } => Ok(()),

            Diff::Put {
                path,
                key,
                old,
                new,
            } => {
                let target = tree.at(path)?;
                let found = tree.child(target, key).and_then(|child| tree.value(child));
                expect_old(path, key, old, found)?;
                tree.replace_child(target, key, new.clone());
                Ok(())
            }

            Diff::Splice {
                path,
                key,
                old,
                new,
            } => {
                let target = tree.at(path)?;
                if tree.kind(target) != Some(NodeKind::List) {
                    return Err(JournalError::NotAList(target));
                }
                let children = tree.children(target);
                let found = children
                    .get(*key..key.saturating_add(old.len()))
                    .map(|run| {
                        Value::Array(run.iter().filter_map(|id| tree.value(*id)).collect())
                    });
                expect_old(path, &Key::Index(*key), &Value::Array(old.clone()), found)?;
                tree.splice(target, *key, old.len(), new.clone());
                Ok(())
            }

            Diff::AddKey { path, key, new } => {
                let target = tree.at(path)?;
                if tree.kind(target) != Some(NodeKind::Map) {
                    return Err(JournalError::NotAMap(target));
                }
                if tree.contains_key(target, key) {
                    warn!(path = %path, key = %key, "add_key overwrote an existing key");
                }
                tree.insert_key(target, key, new.clone());
                Ok(())
            }

            Diff::RemoveKey { path, key, old } => {
                let target = tree.at(path)?;
                let found = tree.get(target, key).and_then(|child| tree.value(child));
                expect_old(path, &Key::from(key.as_str()), old, found)?;
                tree.remove_key(target, key);
                Ok(())
            }
        }
    }
}

fn expect_old(path: &Path, key: &Key, expected: &Value, found: Option<Value>) -> Result<(), JournalError> {
    if found.as_ref() == Some(expected) {
        return Ok(());
    }
    let location = path.child(key.clone()).to_string();
    warn!(%location, "journal desync");
    Err(JournalError::Desync {
        location,
        expected: expected.clone(),
        found,
    })
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(fields) => fields.values().any(contains_null),
        _ => false,
    }
}
