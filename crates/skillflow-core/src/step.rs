//! Workflow step definitions.

use crate::value::ValueMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe step name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StepName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One node of a workflow graph.
///
/// A step names the skill it runs, optional static parameters overlaid onto
/// the carried task parameters, and where to go next on success or failure.
/// `None` transitions are terminal.
///
/// # Examples
///
/// ```
/// use skillflow_core::WorkflowStep;
///
/// let step = WorkflowStep::new("run_tests", "test_runner")
///     .on_success("deliver")
///     .on_fail("fix_code")
///     .with_retry(2);
///
/// assert_eq!(step.skill, "test_runner");
/// assert_eq!(step.on_fail.as_ref().map(|s| s.as_str()), Some("fix_code"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Unique name of the step within its workflow.
    pub name: StepName,
    /// Name of the registered skill this step runs.
    pub skill: String,
    /// Static parameters overlaid onto the carried task parameters.
    #[serde(default)]
    pub params: ValueMap,
    /// Next step after a `200` output.
    #[serde(default)]
    pub on_success: Option<StepName>,
    /// Next step after a `400` or `500` output.
    #[serde(default)]
    pub on_fail: Option<StepName>,
    /// Step-local retry budget.
    #[serde(default)]
    pub retry: u32,
    /// Output keys this step publishes into the read-only context.
    #[serde(default)]
    pub publish: Vec<String>,
}

impl WorkflowStep {
    /// Creates a terminal step running `skill`.
    pub fn new(name: impl Into<StepName>, skill: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skill: skill.into(),
            params: ValueMap::new(),
            on_success: None,
            on_fail: None,
            retry: 0,
            publish: Vec::new(),
        }
    }

    /// Creates a step whose name equals its skill name.
    pub fn for_skill(skill: impl Into<String>) -> Self {
        let skill = skill.into();
        Self::new(skill.clone(), skill)
    }

    pub fn on_success(mut self, next: impl Into<StepName>) -> Self {
        self.on_success = Some(next.into());
        self
    }

    pub fn on_fail(mut self, next: impl Into<StepName>) -> Self {
        self.on_fail = Some(next.into());
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn publish(mut self, key: impl Into<String>) -> Self {
        self.publish.push(key.into());
        self
    }

    /// Iterates over the non-terminal transitions of this step.
    pub fn transitions(&self) -> impl Iterator<Item = &StepName> {
        self.on_success.iter().chain(self.on_fail.iter())
    }
}
