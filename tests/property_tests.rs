//! Property-based tests for the journal and the state tree.
//!
//! These tests use proptest to verify that recorded history can always be
//! walked back to where it started, that no-op writes leave no trace, and
//! that every node has exactly one address.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use turnkeeper::core::{Diff, NodeId, NodeKind, Path, Tree};
use turnkeeper::journal::{GameState, Journal};

fn arbitrary_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ]
}

fn arbitrary_value() -> impl Strategy<Value = Value> {
    arbitrary_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

fn arbitrary_state() -> impl Strategy<Value = GameState> {
    prop::collection::btree_map("[a-z]{1,4}", arbitrary_value(), 1..5).prop_map(|fields| {
        let fields: Map<String, Value> = fields.into_iter().collect();
        GameState::new(fields).unwrap()
    })
}

#[derive(Clone, Debug)]
enum Op {
    Replace(usize, Value),
    Splice(usize, usize, usize, Vec<Value>),
    AddKey(usize, String, Value),
    RemoveKey(usize, usize),
    Checkpoint(String),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), arbitrary_value()).prop_map(|(n, v)| Op::Replace(n, v)),
        (
            any::<usize>(),
            0usize..4,
            0usize..3,
            prop::collection::vec(arbitrary_value(), 0..3)
        )
            .prop_map(|(n, i, r, items)| Op::Splice(n, i, r, items)),
        (any::<usize>(), "[a-z]{1,4}", arbitrary_value()).prop_map(|(n, k, v)| Op::AddKey(n, k, v)),
        (any::<usize>(), any::<usize>()).prop_map(|(n, k)| Op::RemoveKey(n, k)),
        "[a-z]{1,4}".prop_map(Op::Checkpoint),
    ]
}

/// Every live node, parents before children.
fn nodes(tree: &Tree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut pending = vec![tree.root()];
    while let Some(id) = pending.pop() {
        out.push(id);
        pending.extend(tree.children(id));
    }
    out
}

fn nodes_of(tree: &Tree, kind: NodeKind) -> Vec<NodeId> {
    nodes(tree)
        .into_iter()
        .filter(|id| tree.kind(*id) == Some(kind))
        .collect()
}

/// Apply one operation. Rejected operations are fine; they must simply leave
/// no trace, which the callers check through the history.
fn apply(journal: &mut Journal, op: &Op) {
    match op {
        Op::Replace(n, value) => {
            let all = nodes(journal.tree());
            let target = all[n % all.len()];
            let _ = journal.replace(target, value.clone());
        }
        Op::Splice(n, index, remove, items) => {
            let lists = nodes_of(journal.tree(), NodeKind::List);
            if lists.is_empty() {
                return;
            }
            let list = lists[n % lists.len()];
            let _ = journal.splice(list, *index, *remove, items.clone());
        }
        Op::AddKey(n, key, value) => {
            let maps = nodes_of(journal.tree(), NodeKind::Map);
            let map = maps[n % maps.len()];
            if journal.tree().contains_key(map, key) {
                return;
            }
            let _ = journal.add_key(map, key, value.clone());
        }
        Op::RemoveKey(n, k) => {
            let maps = nodes_of(journal.tree(), NodeKind::Map);
            let map = maps[n % maps.len()];
            let keys = journal.tree().keys(map);
            if keys.is_empty() {
                return;
            }
            let _ = journal.remove_key(map, &keys[k % keys.len()]);
        }
        Op::Checkpoint(name) => {
            let _ = journal.checkpoint(name.clone());
        }
    }
}

fn snapshot(journal: &Journal) -> Value {
    journal
        .tree()
        .value(journal.tree().root())
        .unwrap_or(Value::Null)
}

proptest! {
    #[test]
    fn undoing_everything_restores_initial_tree(
        state in arbitrary_state(),
        ops in prop::collection::vec(arbitrary_op(), 0..20),
    ) {
        let mut journal = Journal::new(state);
        let before = snapshot(&journal);

        for op in &ops {
            apply(&mut journal, op);
        }
        while journal.undo().unwrap() {}

        prop_assert!(journal.history().is_empty());
        prop_assert_eq!(snapshot(&journal), before);
    }

    #[test]
    fn redo_replays_undone_history(
        state in arbitrary_state(),
        ops in prop::collection::vec(arbitrary_op(), 0..20),
    ) {
        let mut journal = Journal::new(state);
        for op in &ops {
            apply(&mut journal, op);
        }
        let after = snapshot(&journal);
        let history = journal.history().to_vec();

        while journal.undo().unwrap() {}
        while journal.redo().unwrap() {}

        prop_assert_eq!(snapshot(&journal), after);
        prop_assert_eq!(journal.history(), history.as_slice());
    }

    #[test]
    fn diff_reversal_is_an_involution(
        state in arbitrary_state(),
        ops in prop::collection::vec(arbitrary_op(), 0..20),
    ) {
        let mut journal = Journal::new(state);
        for op in &ops {
            apply(&mut journal, op);
        }

        for diff in journal.history() {
            match diff.reverse() {
                Some(reversed) => prop_assert_eq!(reversed.reverse(), Some(diff.clone())),
                None => prop_assert!(diff.is_checkpoint()),
            }
        }
    }

    #[test]
    fn writing_current_values_records_nothing(state in arbitrary_state()) {
        let mut journal = Journal::new(state);

        for id in nodes(journal.tree()) {
            if id == journal.tree().root() {
                continue;
            }
            let current = journal.tree().value(id).unwrap();
            journal.replace(id, current).unwrap();
        }
        for list in nodes_of(journal.tree(), NodeKind::List) {
            let items = journal
                .tree()
                .value(list)
                .and_then(|v| v.as_array().cloned())
                .unwrap_or_default();
            let len = items.len();
            journal.splice(list, 0, len, items).unwrap();
        }

        prop_assert!(journal.history().is_empty());
    }

    #[test]
    fn every_node_has_one_address(
        state in arbitrary_state(),
        ops in prop::collection::vec(arbitrary_op(), 0..10),
    ) {
        let mut journal = Journal::new(state);
        for op in &ops {
            apply(&mut journal, op);
        }

        let tree = journal.tree();
        for id in nodes(tree) {
            let path = tree.path(id).unwrap();
            prop_assert_eq!(tree.at(&path).unwrap(), id);

            let reparsed: Path = path.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, path);
        }
    }

    #[test]
    fn saved_state_reloads_identically(
        state in arbitrary_state(),
        ops in prop::collection::vec(arbitrary_op(), 0..10),
    ) {
        let mut journal = Journal::new(state);
        for op in &ops {
            apply(&mut journal, op);
        }

        let saved = serde_json::to_string(journal.state()).unwrap();
        let loaded: GameState = serde_json::from_str(&saved).unwrap();
        let mut reloaded = Journal::new(loaded);

        prop_assert_eq!(snapshot(&reloaded), snapshot(&journal));
        prop_assert_eq!(reloaded.history(), journal.history());

        while journal.undo().unwrap() {}
        while reloaded.undo().unwrap() {}
        prop_assert_eq!(snapshot(&reloaded), snapshot(&journal));
    }
}

#[test]
fn checkpoint_diffs_have_no_inverse() {
    let diff = Diff::Checkpoint { name: "turn".to_string() };

    assert_eq!(diff.reverse(), None);
    assert_eq!(serde_json::to_value(&diff).unwrap(), json!({"kind": "checkpoint", "name": "turn"}));
}
