//! What a transition sees while it runs, and how it hands control back.

use crate::core::{NodeId, Tree};
use crate::journal::{Journal, JournalError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request for input from an external actor.
///
/// Stored in the `waiting` list while the workflow is suspended. Fields other
/// than `actor`, `prompt` and `options` are kept in `extra` and serialized
/// alongside them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaitRequest {
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WaitRequest {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            prompt: None,
            options: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// How a transition hands control back to the interpreter.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    /// Call a child transition with the given frame data.
    Push { name: String, data: Value },

    /// Pop the current frame and resume the parent.
    Done,

    /// Like `Done`, but first store a value in the parent's `data.returned`.
    Return(Value),

    /// Suspend until an actor answers one of these requests.
    Wait(Vec<WaitRequest>),

    /// Leave everything as it is and return to the driver.
    Idle,
}

/// Handle given to a transition for the duration of one invocation.
///
/// All edits, including edits to the frame's own `data`, go through
/// [`Context::journal`] so they are recorded and reversible.
pub struct Context<'a, G> {
    journal: &'a mut Journal,
    game: &'a mut G,
    name: String,
    frame: NodeId,
    data: NodeId,
    response: Option<Value>,
}

impl<'a, G> Context<'a, G> {
    pub(crate) fn new(
        journal: &'a mut Journal,
        game: &'a mut G,
        name: String,
        frame: NodeId,
        data: NodeId,
        response: Option<Value>,
    ) -> Self {
        Self {
            journal,
            game,
            name,
            frame,
            data,
            response,
        }
    }

    /// Name of the running transition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the running frame.
    pub fn frame(&self) -> NodeId {
        self.frame
    }

    /// Handle of the frame's workflow-local data map.
    pub fn data(&self) -> NodeId {
        self.data
    }

    /// One field of the frame data, materialized.
    pub fn get(&self, key: &str) -> Option<Value> {
        let tree = self.journal.tree();
        tree.get(self.data, key).and_then(|id| tree.value(id))
    }

    /// Set a frame data field, adding it if absent.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), JournalError> {
        if self.journal.tree().contains_key(self.data, key) {
            self.journal.put(self.data, key, value)
        } else {
            self.journal.add_key(self.data, key, value)
        }
    }

    /// The value the child returned to this frame, if any.
    pub fn returned(&self) -> Option<Value> {
        self.get("returned")
    }

    /// The queued response, if the driver supplied one.
    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn tree(&self) -> &Tree {
        self.journal.tree()
    }

    pub fn journal(&mut self) -> &mut Journal {
        self.journal
    }

    pub fn game(&mut self) -> &mut G {
        self.game
    }

    /// Borrow the journal and the game together.
    pub fn parts(&mut self) -> (&mut Journal, &mut G) {
        (&mut *self.journal, &mut *self.game)
    }

    pub fn push(&self, name: impl Into<String>, data: impl Into<Value>) -> Flow {
        Flow::Push {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn done(&self) -> Flow {
        Flow::Done
    }

    pub fn return_value(&self, value: impl Into<Value>) -> Flow {
        Flow::Return(value.into())
    }

    pub fn wait(&self, request: WaitRequest) -> Flow {
        Flow::Wait(vec![request])
    }

    /// Wait on several actors at once. An empty list is rejected by `run`.
    pub fn wait_many(&self, requests: Vec<WaitRequest>) -> Flow {
        Flow::Wait(requests)
    }
}
