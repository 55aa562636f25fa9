//! The two-namespace context handed to every skill.

use crate::value::{merge_into, Value, ValueMap};
use serde::{Deserialize, Serialize};

/// Facts produced by earlier steps.
///
/// Skills only ever see this through a shared reference, so they cannot
/// change it. The workflow engine publishes into it; keys are never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadOnlyContext(ValueMap);

impl ReadOnlyContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` has been published.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Publishes a fact. Returns `true` if the key is new.
    ///
    /// Existing keys keep their slot and take the newer value.
    pub fn publish(&mut self, key: impl Into<String>, value: Value) -> bool {
        self.0.insert(key.into(), value).is_none()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &ValueMap {
        &self.0
    }
}

impl From<ValueMap> for ReadOnlyContext {
    fn from(map: ValueMap) -> Self {
        Self(map)
    }
}

/// Execution context passed to skills.
///
/// # Examples
///
/// ```
/// use skillflow_core::SkillContext;
/// use serde_json::json;
///
/// let mut ctx = SkillContext::new();
/// ctx.read_only.publish("requirements", json!(["login page"]));
/// ctx.writable.insert("draft".to_string(), json!("v1"));
///
/// let merged = ctx.merged();
/// assert_eq!(merged.get("requirements"), Some(&json!(["login page"])));
/// assert_eq!(merged.get("draft"), Some(&json!("v1")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillContext {
    /// Facts from earlier steps.
    #[serde(default)]
    pub read_only: ReadOnlyContext,
    /// Scratch space any step may extend.
    #[serde(default)]
    pub writable: ValueMap,
}

impl SkillContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a key up in `writable` first, then `read_only`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.writable.get(key).or_else(|| self.read_only.get(key))
    }

    /// Merges `data` into the writable namespace.
    pub fn absorb(&mut self, data: &ValueMap) {
        merge_into(&mut self.writable, data);
    }

    /// Flattens both namespaces; writable entries shadow read-only ones.
    pub fn merged(&self) -> ValueMap {
        let mut merged = self.read_only.as_map().clone();
        merge_into(&mut merged, &self.writable);
        merged
    }
}
