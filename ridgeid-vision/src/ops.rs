//! Named session hooks for models exported with custom training-time ops.
//!
//! Some artifacts come from training graphs that carry custom metrics or
//! layers. Each hook gets a chance to adjust the session builder (register a
//! custom op library, tweak options) before the artifact is committed. Hooks
//! are looked up by name; requesting an unregistered one is a hard error.

use std::collections::BTreeMap;

use ort::session::builder::SessionBuilder;

use crate::error::ModelError;

/// Hook applied to a session builder before committing an artifact.
pub type SessionHook = fn(SessionBuilder) -> ort::Result<SessionBuilder>;

/// Registry of named [`SessionHook`]s.
pub struct OperatorRegistry {
    hooks: BTreeMap<String, SessionHook>,
}

impl OperatorRegistry {
    /// Empty registry with no hooks.
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the hooks our standard artifacts need.
    ///
    /// `iou` covers segmentation models exported with an intersection-over-
    /// union training metric. The metric lives outside the inference graph,
    /// so the hook leaves the builder untouched.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("iou", |builder| Ok(builder));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, hook: SessionHook) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Look up a hook by name.
    pub fn hook(&self, name: &str) -> Result<SessionHook, ModelError> {
        self.hooks
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownOperator(name.to_string()))
    }

    /// Run every registered hook over the builder, in name order.
    pub fn apply_all(&self, builder: SessionBuilder) -> ort::Result<SessionBuilder> {
        self.hooks
            .values()
            .try_fold(builder, |builder, hook| hook(builder))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
