//! Arena-backed state tree.
//!
//! The tree stores one game session as nested maps, lists and scalars. Every
//! node lives in an arena slot and is addressed by a [`NodeId`] handle.
//! Nodes are only ever created by inserting a plain [`serde_json::Value`],
//! which allocates a fresh subtree, so no two containers share a node and each
//! node is reachable through exactly one path from the root.
//!
//! Slots are generational: once a subtree is released its handles go stale
//! and stop resolving, even if the slot is reused for a later insert.

use super::path::{Key, Path, PathError};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;

/// Handle to a node in a [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The shape of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Map,
    List,
}

#[derive(Clone, Debug)]
enum Node {
    Scalar(Value),
    Map(IndexMap<String, NodeId>),
    List(Vec<NodeId>),
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Rooted, acyclic tree of maps, lists and scalars.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::from_map(Map::new())
    }
}

impl Tree {
    /// Build a tree whose root map holds the given fields.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.insert(Value::Object(fields));
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the handle still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|node| match node {
            Node::Scalar(_) => NodeKind::Scalar,
            Node::Map(_) => NodeKind::Map,
            Node::List(_) => NodeKind::List,
        })
    }

    /// Materialize the subtree under `id` as a plain value.
    pub fn value(&self, id: NodeId) -> Option<Value> {
        Some(match self.node(id)? {
            Node::Scalar(value) => value.clone(),
            Node::Map(entries) => {
                let mut map = Map::new();
                for (key, child) in entries {
                    map.insert(key.clone(), self.value(*child)?);
                }
                Value::Object(map)
            }
            Node::List(items) => Value::Array(
                items
                    .iter()
                    .map(|child| self.value(*child))
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// The entire tree as a map of root fields.
    pub fn root_fields(&self) -> Map<String, Value> {
        match self.value(self.root) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Look up a map entry.
    pub fn get(&self, map: NodeId, key: &str) -> Option<NodeId> {
        match self.node(map)? {
            Node::Map(entries) => entries.get(key).copied(),
            _ => None,
        }
    }

    /// Look up a list element.
    pub fn get_index(&self, list: NodeId, index: usize) -> Option<NodeId> {
        match self.node(list)? {
            Node::List(items) => items.get(index).copied(),
            _ => None,
        }
    }

    /// Look up a child by either kind of key.
    pub fn child(&self, container: NodeId, key: &Key) -> Option<NodeId> {
        match key {
            Key::Field(name) => self.get(container, name),
            Key::Index(index) => self.get_index(container, *index),
        }
    }

    pub fn contains_key(&self, map: NodeId, key: &str) -> bool {
        self.get(map, key).is_some()
    }

    /// Number of entries in a map or list; `None` for scalars.
    pub fn len(&self, container: NodeId) -> Option<usize> {
        match self.node(container)? {
            Node::Map(entries) => Some(entries.len()),
            Node::List(items) => Some(items.len()),
            Node::Scalar(_) => None,
        }
    }

    /// Keys of a map, in insertion order.
    pub fn keys(&self, map: NodeId) -> Vec<String> {
        match self.node(map) {
            Some(Node::Map(entries)) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Child handles of a map (insertion order) or list (index order).
    pub fn children(&self, container: NodeId) -> Vec<NodeId> {
        match self.node(container) {
            Some(Node::Map(entries)) => entries.values().copied().collect(),
            Some(Node::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Find the path to `target` by depth-first search from the root.
    ///
    /// Map entries are visited in insertion order and list elements in index
    /// order, so the result is deterministic.
    pub fn path(&self, target: NodeId) -> Result<Path, PathError> {
        if !self.contains(target) {
            return Err(PathError::NotFound(target));
        }

        let mut pending = vec![(self.root, Path::root())];
        while let Some((id, path)) = pending.pop() {
            if id == target {
                return Ok(path);
            }
            match self.node(id) {
                Some(Node::Map(entries)) => {
                    for (key, child) in entries.iter().rev() {
                        pending.push((*child, path.child(key.as_str())));
                    }
                }
                Some(Node::List(items)) => {
                    for (index, child) in items.iter().enumerate().rev() {
                        pending.push((*child, path.child(index)));
                    }
                }
                _ => {}
            }
        }

        Err(PathError::NotFound(target))
    }

    /// Resolve a path to a handle.
    pub fn at(&self, path: &Path) -> Result<NodeId, PathError> {
        let mut current = self.root;
        for key in path.keys() {
            current = self
                .child(current, key)
                .ok_or_else(|| PathError::InvalidPath {
                    path: path.to_string(),
                    segment: key.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Split the path of `target` into its container path and final key.
    pub fn locate(&self, target: NodeId) -> Result<(Path, Key), PathError> {
        let path = self.path(target)?;
        let (container, key) = path.split_last().ok_or(PathError::RootHasNoKey)?;
        Ok((container, key.clone()))
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Allocate a fresh subtree for `value`.
    pub(crate) fn insert(&mut self, value: Value) -> NodeId {
        match value {
            Value::Object(fields) => {
                let mut entries = IndexMap::with_capacity(fields.len());
                for (key, child) in fields {
                    let id = self.insert(child);
                    entries.insert(key, id);
                }
                self.alloc(Node::Map(entries))
            }
            Value::Array(items) => {
                let ids = items.into_iter().map(|item| self.insert(item)).collect();
                self.alloc(Node::List(ids))
            }
            scalar => self.alloc(Node::Scalar(scalar)),
        }
    }

    /// Free the subtree under `id`, invalidating every handle inside it.
    pub(crate) fn release(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        match node {
            Node::Map(entries) => entries.into_values().for_each(|child| self.release(child)),
            Node::List(items) => items.into_iter().for_each(|child| self.release(child)),
            Node::Scalar(_) => {}
        }
    }

    /// Replace the child at `key`, which must already exist.
    pub(crate) fn replace_child(&mut self, container: NodeId, key: &Key, value: Value) -> bool {
        let Some(previous) = self.child(container, key) else {
            return false;
        };
        let fresh = self.insert(value);
        let slot = match (self.node_mut(container), key) {
            (Some(Node::Map(entries)), Key::Field(name)) => entries.get_mut(name.as_str()),
            (Some(Node::List(items)), Key::Index(index)) => items.get_mut(*index),
            _ => None,
        };
        match slot {
            Some(slot) => {
                *slot = fresh;
                self.release(previous);
                true
            }
            None => {
                self.release(fresh);
                false
            }
        }
    }

    /// Set a map entry, releasing any previous value under the same key.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub(crate) fn insert_key(&mut self, map: NodeId, key: &str, value: Value) -> bool {
        if !matches!(self.node(map), Some(Node::Map(_))) {
            return false;
        }
        let fresh = self.insert(value);
        let previous = match self.node_mut(map) {
            Some(Node::Map(entries)) => entries.insert(key.to_string(), fresh),
            _ => None,
        };
        if let Some(previous) = previous {
            self.release(previous);
        }
        true
    }

    /// Remove a map entry, returning its materialized value.
    pub(crate) fn remove_key(&mut self, map: NodeId, key: &str) -> Option<Value> {
        let removed = match self.node_mut(map)? {
            Node::Map(entries) => entries.shift_remove(key)?,
            _ => return None,
        };
        let value = self.value(removed);
        self.release(removed);
        value
    }

    /// Replace `count` list elements starting at `index` with `items`.
    ///
    /// The caller checks bounds; out-of-range requests return `None` without
    /// touching the tree.
    pub(crate) fn splice(
        &mut self,
        list: NodeId,
        index: usize,
        count: usize,
        items: Vec<Value>,
    ) -> Option<Vec<Value>> {
        match self.node(list)? {
            Node::List(current) if index + count <= current.len() => {}
            _ => return None,
        }

        let fresh: Vec<NodeId> = items.into_iter().map(|item| self.insert(item)).collect();
        let removed: Vec<NodeId> = match self.node_mut(list) {
            Some(Node::List(current)) => current.splice(index..index + count, fresh).collect(),
            _ => Vec::new(),
        };

        let mut values = Vec::with_capacity(removed.len());
        for id in removed {
            if let Some(value) = self.value(id) {
                values.push(value);
            }
            self.release(id);
        }
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Tree {
        let Value::Object(fields) = json!({
            "players": [
                {"name": "alice", "hand": ["a", "b"]},
                {"name": "bob", "hand": []},
            ],
            "zones": {"deck": [1, 2, 3]},
        }) else {
            unreachable!()
        };
        Tree::from_map(fields)
    }

    #[test]
    fn root_has_root_path() {
        let tree = sample();
        assert_eq!(tree.path(tree.root()).unwrap(), Path::root());
    }

    #[test]
    fn path_uses_dot_and_bracket_notation() {
        let tree = sample();
        let players = tree.get(tree.root(), "players").unwrap();
        let bob = tree.get_index(players, 1).unwrap();
        let hand = tree.get(bob, "hand").unwrap();
        assert_eq!(tree.path(hand).unwrap().to_string(), ".players[1].hand");
    }

    #[test]
    fn at_inverts_path_for_every_node() {
        let tree = sample();
        let mut pending = vec![tree.root()];
        while let Some(id) = pending.pop() {
            let path = tree.path(id).unwrap();
            assert_eq!(tree.at(&path).unwrap(), id);
            pending.extend(tree.children(id));
        }
    }

    #[test]
    fn at_reports_missing_segment() {
        let tree = sample();
        let path: Path = ".players[5].hand".parse().unwrap();
        match tree.at(&path) {
            Err(PathError::InvalidPath { segment, .. }) => assert_eq!(segment, "[5]"),
            other => panic!("expected InvalidPath, got {other:?}"),
        }
    }

    #[test]
    fn locate_splits_container_and_key() {
        let tree = sample();
        let deck = tree.at(&".zones.deck".parse().unwrap()).unwrap();
        let card = tree.get_index(deck, 2).unwrap();
        let (container, key) = tree.locate(card).unwrap();
        assert_eq!(container.to_string(), ".zones.deck");
        assert_eq!(key, Key::Index(2));
        assert_eq!(tree.locate(tree.root()), Err(PathError::RootHasNoKey));
    }

    #[test]
    fn released_handles_go_stale() {
        let mut tree = sample();
        let zones = tree.get(tree.root(), "zones").unwrap();
        let deck = tree.get(zones, "deck").unwrap();
        let first = tree.get_index(deck, 0).unwrap();

        let removed = tree.splice(deck, 0, 1, vec![]).unwrap();
        assert_eq!(removed, vec![json!(1)]);
        assert!(!tree.contains(first));
        assert_eq!(tree.path(first), Err(PathError::NotFound(first)));

        // The freed slot is reused, but the old handle still does not resolve.
        tree.splice(deck, 0, 0, vec![json!(9)]).unwrap();
        assert!(!tree.contains(first));
        assert_eq!(tree.value(deck).unwrap(), json!([9, 2, 3]));
    }

    #[test]
    fn value_materializes_in_insertion_order() {
        let tree = sample();
        let keys: Vec<String> = tree.root_fields().keys().cloned().collect();
        assert_eq!(keys, vec!["players", "zones"]);
    }

    #[test]
    fn replace_child_swaps_subtree() {
        let mut tree = sample();
        let players = tree.get(tree.root(), "players").unwrap();
        let alice = tree.get_index(players, 0).unwrap();
        assert!(tree.replace_child(players, &Key::Index(0), json!({"name": "carol"})));
        assert!(!tree.contains(alice));
        let carol = tree.get_index(players, 0).unwrap();
        assert_eq!(tree.value(carol).unwrap(), json!({"name": "carol"}));
    }

    #[test]
    fn out_of_range_splice_leaves_tree_alone() {
        let mut tree = sample();
        let deck = tree.at(&".zones.deck".parse().unwrap()).unwrap();
        assert!(tree.splice(deck, 2, 5, vec![]).is_none());
        assert_eq!(tree.value(deck).unwrap(), json!([1, 2, 3]));
    }
}
