//! Skill input.

use crate::context::SkillContext;
use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The task a skill is asked to perform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// What the task operates on (a project, a file, a service).
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub params: ValueMap,
    /// Per-task timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Per-task execution retry override.
    #[serde(default)]
    pub max_retry: Option<u32>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Everything a skill receives for one invocation.
///
/// # Examples
///
/// ```
/// use skillflow_core::SkillInput;
/// use serde_json::json;
///
/// let input = SkillInput::new("trace-1", "collect")
///     .with_param("source", json!("issue-42"))
///     .with_config("verbose", json!(true));
///
/// assert_eq!(input.trace_id, "trace-1");
/// assert_eq!(input.param("source"), Some(&json!("issue-42")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInput {
    /// Free-form options.
    #[serde(default)]
    pub config: ValueMap,
    #[serde(default)]
    pub context: SkillContext,
    #[serde(default)]
    pub task: TaskSpec,
    /// Where a skill may write snapshots of its work.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    /// Correlation id, stable for one workflow execution.
    #[serde(default)]
    pub trace_id: String,
}

impl SkillInput {
    pub fn new(trace_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            task: TaskSpec::new(task_name),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.task.params.insert(key.into(), value);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn with_context(mut self, context: SkillContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.task.target = Some(target.into());
        self
    }

    /// Returns a task parameter.
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.task.params.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_deserializes_partial_document() {
        let input: SkillInput = serde_json::from_value(json!({
            "traceId": "t-9",
            "task": {"name": "lint", "timeoutMs": 500}
        }))
        .unwrap();

        assert_eq!(input.trace_id, "t-9");
        assert_eq!(input.task.timeout(), Some(Duration::from_millis(500)));
        assert!(input.context.writable.is_empty());
    }
}
