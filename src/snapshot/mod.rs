//! Persisting a session between runs.
//!
//! A snapshot wraps the serialized [`GameState`] (tree plus diff log) in a
//! small envelope identifying the session and the format version. The redo
//! stack is not part of a snapshot; restoring one starts with nothing to redo.

use crate::journal::{GameState, Journal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable copy of one session.
/// Does NOT include transition code (not serializable).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// Session this snapshot belongs to
    pub session: Uuid,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// State tree and history
    pub state: GameState,
}

impl Snapshot {
    /// Copy the journal's current state.
    pub fn capture(session: Uuid, journal: &Journal) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            session,
            taken_at: Utc::now(),
            state: journal.state().clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Parse a snapshot, rejecting versions this build cannot read.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        debug!(
            session = %snapshot.session,
            history = snapshot.state.history().len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Open a journal over the saved state.
    pub fn restore(self) -> Journal {
        Journal::new(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn journal() -> Journal {
        let state = GameState::from_value(json!({"round": 1, "deck": ["a", "b"]})).unwrap();
        let mut journal = Journal::new(state);
        let root = journal.tree().root();
        journal.checkpoint("start").unwrap();
        journal.increment(root, "round").unwrap();
        journal
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let journal = journal();
        let session = Uuid::new_v4();
        let snapshot = Snapshot::capture(session, &journal);

        let json = snapshot.to_json().unwrap();
        let loaded = Snapshot::from_json(&json).unwrap();

        assert_eq!(loaded.id, snapshot.id);
        assert_eq!(loaded.session, session);
        assert_eq!(
            serde_json::to_value(&loaded.state).unwrap(),
            serde_json::to_value(journal.state()).unwrap()
        );
    }

    #[test]
    fn restored_journal_can_undo_saved_history() {
        let json = Snapshot::capture(Uuid::new_v4(), &journal()).to_json_pretty().unwrap();
        let mut restored = Snapshot::from_json(&json).unwrap().restore();

        assert!(restored.can_undo());
        assert!(!restored.can_redo());
        assert_eq!(restored.undo_to("start").unwrap(), 2);

        let root = restored.tree().root();
        let round = restored.tree().get(root, "round").unwrap();
        assert_eq!(restored.tree().value(round), Some(json!(1)));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut value = serde_json::to_value(Snapshot::capture(Uuid::new_v4(), &journal())).unwrap();
        value["version"] = json!(99);

        let result = Snapshot::from_json(&value.to_string());

        assert!(matches!(
            result,
            Err(SnapshotError::UnsupportedVersion { found: 99, supported: 1 })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let result = Snapshot::from_json("{not json");

        assert!(matches!(result, Err(SnapshotError::DeserializationFailed(_))));
    }
}
