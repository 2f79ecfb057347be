//! Interpreter configuration.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the name and data of every pushed frame.
pub type PushHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Options tuning how frames are pushed.
#[derive(Clone, Default)]
pub struct MachineOptions {
    /// Data keys a child frame inherits from its parent when it does not set
    /// them itself, e.g. a log indentation id.
    pub inherited_keys: Vec<String>,

    /// Called before each frame is pushed.
    pub on_push: Option<PushHook>,
}

impl MachineOptions {
    pub fn inherit_key(mut self, key: impl Into<String>) -> Self {
        self.inherited_keys.push(key.into());
        self
    }

    pub fn on_push<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.on_push = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for MachineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineOptions")
            .field("inherited_keys", &self.inherited_keys)
            .field("on_push", &self.on_push.is_some())
            .finish()
    }
}
