//! The persisted game state: tree plus history log.

use super::error::JournalError;
use crate::core::{Diff, Key, Tree};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root key holding the diff log in serialized form.
pub const HISTORY_KEY: &str = "history";
/// Root list holding the interpreter's call stack.
pub const STACK_KEY: &str = "stack";
/// Root list holding outstanding wait requests.
pub const WAITING_KEY: &str = "waiting";
/// Root list holding the queued response, if any.
pub const RESPONSE_KEY: &str = "response";

/// One game session: the state tree and its diff log.
///
/// Serializes as a single JSON object, the root map's fields followed by a
/// `history` field with the log. Loading that object back yields an
/// identical tree and log.
///
/// # Example
///
/// ```rust
/// use turnkeeper::journal::GameState;
/// use serde_json::json;
///
/// let state = GameState::from_value(json!({"round": 1})).unwrap();
/// let json = serde_json::to_value(&state).unwrap();
/// assert_eq!(json["round"], json!(1));
/// assert_eq!(json["stack"], json!([]));
/// assert_eq!(json["history"], json!([]));
/// ```
#[derive(Clone, Debug, Default)]
pub struct GameState {
    pub(crate) tree: Tree,
    pub(crate) history: Vec<Diff>,
}

impl GameState {
    /// Create a fresh session from the initial root fields.
    ///
    /// The interpreter's `stack`, `waiting` and `response` lists are added if
    /// absent. Nothing is recorded. Fails if any key at any depth cannot be
    /// addressed by a path, or if a root field is named `history`.
    pub fn new(mut fields: Map<String, Value>) -> Result<Self, JournalError> {
        check_root_fields(&fields)?;
        for key in [STACK_KEY, WAITING_KEY, RESPONSE_KEY] {
            fields
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()));
        }
        Ok(Self {
            tree: Tree::from_map(fields),
            history: Vec::new(),
        })
    }

    /// Create a fresh session from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, JournalError> {
        match value {
            Value::Object(fields) => Self::new(fields),
            _ => Err(JournalError::NotAnObject),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn history(&self) -> &[Diff] {
        &self.history
    }
}

impl Serialize for GameState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.tree.root_fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
        for (key, value) in &fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(HISTORY_KEY, &self.history)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for GameState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;

        let mut fields = Map::new();
        let mut history = Vec::new();
        for (key, value) in raw {
            if key == HISTORY_KEY {
                history = serde_json::from_value(value).map_err(de::Error::custom)?;
            } else {
                fields.insert(key, value);
            }
        }

        // Loaded as-is; control lists are only added to fresh sessions.
        check_root_fields(&fields).map_err(de::Error::custom)?;
        Ok(Self {
            tree: Tree::from_map(fields),
            history,
        })
    }
}

fn check_root_fields(fields: &Map<String, Value>) -> Result<(), JournalError> {
    if fields.contains_key(HISTORY_KEY) {
        return Err(JournalError::ReservedKey {
            key: HISTORY_KEY.to_string(),
        });
    }
    for (key, value) in fields {
        check_key(key)?;
        check_keys(value)?;
    }
    Ok(())
}

fn check_key(key: &str) -> Result<(), JournalError> {
    if Key::from(key).is_addressable() {
        Ok(())
    } else {
        Err(JournalError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Reject values holding a map key, at any depth, that a path cannot name.
pub(crate) fn check_keys(value: &Value) -> Result<(), JournalError> {
    match value {
        Value::Object(fields) => fields.iter().try_for_each(|(key, value)| {
            check_key(key)?;
            check_keys(value)
        }),
        Value::Array(items) => items.iter().try_for_each(check_keys),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_history_field_is_rejected() {
        let result = GameState::from_value(json!({"history": ["turn 1 log"], "score": 0}));

        assert_eq!(
            result.unwrap_err(),
            JournalError::ReservedKey {
                key: HISTORY_KEY.to_string()
            }
        );
    }

    #[test]
    fn unaddressable_keys_are_rejected_at_any_depth() {
        let nested = GameState::from_value(json!({"cards": {"deck": {"Dr. Who": {"count": 1}}}}));
        assert_eq!(
            nested.unwrap_err(),
            JournalError::InvalidKey {
                key: "Dr. Who".to_string()
            }
        );

        let in_list = GameState::from_value(json!({"log": [{"a[0]": 1}]}));
        assert!(matches!(in_list, Err(JournalError::InvalidKey { .. })));

        let at_root = GameState::from_value(json!({"x.y": 1}));
        assert!(matches!(at_root, Err(JournalError::InvalidKey { .. })));
    }

    #[test]
    fn loading_rejects_unaddressable_keys() {
        let result: Result<GameState, _> =
            serde_json::from_value(json!({"deck": {"Dr. Who": 1}, "history": []}));
        assert!(result.is_err());
    }

    #[test]
    fn loading_does_not_add_control_lists() {
        let state: GameState = serde_json::from_value(json!({"round": 2, "history": []})).unwrap();
        let keys: Vec<String> = state.tree().root_fields().keys().cloned().collect();
        assert_eq!(keys, vec!["round"]);
    }

    #[test]
    fn new_adds_control_lists() {
        let state = GameState::from_value(json!({"players": []})).unwrap();
        let fields = state.tree().root_fields();
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["players", "stack", "waiting", "response"]);
    }

    #[test]
    fn existing_control_lists_are_kept() {
        let state = GameState::from_value(json!({"stack": [{"name": "END", "data": {}}]})).unwrap();
        assert_eq!(
            state.tree().root_fields()["stack"],
            json!([{"name": "END", "data": {}}])
        );
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(
            GameState::from_value(json!([1, 2])).unwrap_err(),
            JournalError::NotAnObject
        );
    }

    #[test]
    fn history_round_trips_through_json() {
        let mut state = GameState::from_value(json!({"score": 1})).unwrap();
        state.history.push(Diff::Checkpoint {
            name: "start".to_string(),
        });

        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.history(), state.history());
        assert_eq!(back.tree().root_fields(), state.tree().root_fields());
        assert!(!back.tree().root_fields().contains_key(HISTORY_KEY));
    }
}
