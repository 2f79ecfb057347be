//! Stack-based workflow interpreter.

use super::context::{Context, Flow, WaitRequest};
use super::error::MachineError;
use super::options::MachineOptions;
use super::transition::{TransitionTable, END, ROOT};
use crate::core::NodeId;
use crate::journal::{Journal, RESPONSE_KEY, STACK_KEY, WAITING_KEY};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Where the workflow stands after a call to [`StateMachine::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineStatus {
    /// Not waiting on anyone; calling `run` again will make progress.
    Active,

    /// Waiting for an actor to answer the `waiting` requests.
    Suspended,

    /// An `END` frame is on top of the stack; `run` does nothing.
    Terminal,
}

/// Handles of the control lists in the root map.
#[derive(Clone, Copy)]
struct Control {
    stack: NodeId,
    waiting: NodeId,
    response: NodeId,
}

impl Control {
    fn resolve(journal: &Journal) -> Result<Self, MachineError> {
        let tree = journal.tree();
        let root = tree.root();
        let list = |key: &str| {
            tree.get(root, key)
                .ok_or_else(|| MachineError::CorruptControl(format!("missing {key} list")))
        };
        Ok(Self {
            stack: list(STACK_KEY)?,
            waiting: list(WAITING_KEY)?,
            response: list(RESPONSE_KEY)?,
        })
    }
}

/// Runs a table of named transitions against a journaled game state.
///
/// The machine itself holds no session state: the call stack, outstanding
/// requests and queued response all live in the state tree and every change
/// to them goes through the [`Journal`]. Undoing the journal therefore
/// rewinds control flow along with game data, and one machine can drive any
/// number of independent sessions.
///
/// `push` and `done` are trampolined through the stored stack, so native
/// call depth stays constant no matter how deeply workflows nest.
pub struct StateMachine<G> {
    transitions: TransitionTable<G>,
    options: MachineOptions,
}

impl<G> StateMachine<G> {
    /// Create a machine, rejecting tables that fail validation.
    pub fn new(transitions: TransitionTable<G>, options: MachineOptions) -> Result<Self, MachineError> {
        transitions.check().map_err(MachineError::InvalidTable)?;
        Ok(Self::from_checked(transitions, options))
    }

    /// Assemble a machine from a table that has already passed validation.
    pub(crate) fn from_checked(transitions: TransitionTable<G>, options: MachineOptions) -> Self {
        Self {
            transitions,
            options,
        }
    }

    pub fn transitions(&self) -> &TransitionTable<G> {
        &self.transitions
    }

    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    /// Run until the workflow suspends, finishes, or goes idle.
    ///
    /// An empty stack starts the `root` transition. Errors raised by rule
    /// code are returned unmodified.
    pub fn run(&self, journal: &mut Journal, game: &mut G) -> Result<MachineStatus, MachineError> {
        loop {
            let control = Control::resolve(journal)?;

            let Some(frame) = top_frame(journal, control) else {
                self.push_frame(journal, control, ROOT, Value::Object(Map::new()))?;
                continue;
            };

            let name = frame_name(journal, frame)?;
            if name == END {
                return Ok(MachineStatus::Terminal);
            }

            let action = self
                .transitions
                .get(&name)
                .ok_or_else(|| MachineError::UndefinedTransition { name: name.clone() })?;

            let tree = journal.tree();
            let data = tree
                .get(frame, "data")
                .ok_or_else(|| MachineError::CorruptControl(format!("frame {name} has no data")))?;
            let response = tree
                .get_index(control.response, 0)
                .and_then(|id| tree.value(id));

            trace!(transition = %name, has_response = response.is_some(), "invoking transition");
            let flow = {
                let mut context = Context::new(journal, game, name.clone(), frame, data, response);
                action(&mut context)?
            };

            match flow {
                Flow::Push { name: child, data } => {
                    self.clear_waiting(journal, control)?;
                    self.push_frame(journal, control, &child, data)?;
                }
                Flow::Done => {
                    if self.pop_frame(journal, control)? == 0 {
                        return Ok(MachineStatus::Active);
                    }
                }
                Flow::Return(value) => {
                    self.write_returned(journal, control, value)?;
                    if self.pop_frame(journal, control)? == 0 {
                        return Ok(MachineStatus::Active);
                    }
                }
                Flow::Wait(requests) if requests.is_empty() => {
                    return Err(MachineError::EmptyWait { name });
                }
                Flow::Wait(requests) => {
                    self.suspend(journal, control, &requests)?;
                    return Ok(MachineStatus::Suspended);
                }
                Flow::Idle => return self.status(journal),
            }
        }
    }

    /// Current status, read from the state tree.
    pub fn status(&self, journal: &Journal) -> Result<MachineStatus, MachineError> {
        let control = Control::resolve(journal)?;
        if let Some(frame) = top_frame(journal, control) {
            if frame_name(journal, frame)? == END {
                return Ok(MachineStatus::Terminal);
            }
        }
        if journal.tree().len(control.waiting).unwrap_or(0) > 0 {
            Ok(MachineStatus::Suspended)
        } else {
            Ok(MachineStatus::Active)
        }
    }

    pub fn is_terminal(&self, journal: &Journal) -> Result<bool, MachineError> {
        Ok(self.status(journal)? == MachineStatus::Terminal)
    }

    /// Queue the answer to the outstanding request, replacing any response
    /// already queued.
    pub fn respond(&self, journal: &mut Journal, response: impl Into<Value>) -> Result<(), MachineError> {
        let control = Control::resolve(journal)?;
        let len = journal.tree().len(control.response).unwrap_or(0);
        journal.splice(control.response, 0, len, vec![response.into()])?;
        Ok(())
    }

    /// Outstanding requests.
    pub fn waiting(&self, journal: &Journal) -> Result<Vec<WaitRequest>, MachineError> {
        let control = Control::resolve(journal)?;
        let value = journal
            .tree()
            .value(control.waiting)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(value)?)
    }

    /// Actors named by the outstanding requests, in request order.
    pub fn waiting_actors(&self, journal: &Journal) -> Result<Vec<String>, MachineError> {
        Ok(self
            .waiting(journal)?
            .into_iter()
            .map(|request| request.actor)
            .collect())
    }

    /// Frame names from the bottom of the stack to the top.
    pub fn stack_names(&self, journal: &Journal) -> Result<Vec<String>, MachineError> {
        let control = Control::resolve(journal)?;
        let names = journal
            .tree()
            .children(control.stack)
            .into_iter()
            .map(|frame| frame_name(journal, frame))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(stack = ?names, "stack");
        Ok(names)
    }

    fn push_frame(
        &self,
        journal: &mut Journal,
        control: Control,
        name: &str,
        data: Value,
    ) -> Result<(), MachineError> {
        let mut data = match data {
            Value::Null => Map::new(),
            Value::Object(fields) => fields,
            _ => {
                return Err(MachineError::InvalidFrameData {
                    name: name.to_string(),
                })
            }
        };

        if let Some(parent) = top_frame(journal, control) {
            let tree = journal.tree();
            if let Some(parent_data) = tree.get(parent, "data") {
                for key in &self.options.inherited_keys {
                    if data.contains_key(key) {
                        continue;
                    }
                    if let Some(value) = tree.get(parent_data, key).and_then(|id| tree.value(id)) {
                        data.insert(key.clone(), value);
                    }
                }
            }
        }

        let data = Value::Object(data);
        if let Some(hook) = &self.options.on_push {
            hook(name, &data);
        }

        let mut frame = Map::new();
        frame.insert("name".to_string(), Value::String(name.to_string()));
        frame.insert("data".to_string(), data);
        journal.push(control.stack, Value::Object(frame))?;

        debug!(
            transition = name,
            depth = journal.tree().len(control.stack).unwrap_or(0),
            "pushed frame"
        );
        Ok(())
    }

    /// Pop the top frame and clear any pending wait. Returns the new depth.
    fn pop_frame(&self, journal: &mut Journal, control: Control) -> Result<usize, MachineError> {
        let popped = journal.pop(control.stack)?;
        self.clear_waiting(journal, control)?;

        let depth = journal.tree().len(control.stack).unwrap_or(0);
        let name = popped
            .as_ref()
            .and_then(|frame| frame.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!(transition = name, depth, "popped frame");
        Ok(depth)
    }

    fn write_returned(&self, journal: &mut Journal, control: Control, value: Value) -> Result<(), MachineError> {
        if value.is_null() {
            return Ok(());
        }

        let tree = journal.tree();
        let depth = tree.len(control.stack).unwrap_or(0);
        let Some(parent) = depth
            .checked_sub(2)
            .and_then(|index| tree.get_index(control.stack, index))
        else {
            return Ok(());
        };
        let parent_data = tree
            .get(parent, "data")
            .ok_or_else(|| MachineError::CorruptControl("parent frame has no data".to_string()))?;

        if tree.contains_key(parent_data, "returned") {
            journal.put(parent_data, "returned", value)?;
        } else {
            journal.add_key(parent_data, "returned", value)?;
        }
        Ok(())
    }

    fn suspend(&self, journal: &mut Journal, control: Control, requests: &[WaitRequest]) -> Result<(), MachineError> {
        let items = requests
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let waiting_len = journal.tree().len(control.waiting).unwrap_or(0);
        journal.splice(control.waiting, 0, waiting_len, items)?;
        let response_len = journal.tree().len(control.response).unwrap_or(0);
        journal.splice(control.response, 0, response_len, Vec::new())?;

        debug!(
            actors = ?requests.iter().map(|r| r.actor.as_str()).collect::<Vec<_>>(),
            "waiting"
        );
        Ok(())
    }

    fn clear_waiting(&self, journal: &mut Journal, control: Control) -> Result<(), MachineError> {
        let waiting_len = journal.tree().len(control.waiting).unwrap_or(0);
        journal.splice(control.waiting, 0, waiting_len, Vec::new())?;
        let response_len = journal.tree().len(control.response).unwrap_or(0);
        journal.splice(control.response, 0, response_len, Vec::new())?;
        Ok(())
    }
}

impl<G> std::fmt::Debug for StateMachine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("transitions", &self.transitions)
            .field("options", &self.options)
            .finish()
    }
}

fn top_frame(journal: &Journal, control: Control) -> Option<NodeId> {
    let tree = journal.tree();
    let depth = tree.len(control.stack)?;
    tree.get_index(control.stack, depth.checked_sub(1)?)
}

fn frame_name(journal: &Journal, frame: NodeId) -> Result<String, MachineError> {
    let tree = journal.tree();
    tree.get(frame, "name")
        .and_then(|id| tree.value(id))
        .and_then(|value| value.as_str().map(str::to_string))
        .ok_or_else(|| MachineError::CorruptControl("frame has no name".to_string()))
}
