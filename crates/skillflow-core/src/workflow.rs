//! Declarative workflow graphs.

use crate::error::WorkflowError;
use crate::step::{StepName, WorkflowStep};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, versioned graph of steps.
///
/// Cycles are allowed; they model loop-backs such as "fix, then test again".
///
/// # Examples
///
/// ```
/// use skillflow_core::{WorkflowDefinition, WorkflowStep};
///
/// let workflow = WorkflowDefinition::new("delivery", "collect")
///     .step(WorkflowStep::for_skill("collect").on_success("analyze"))
///     .step(WorkflowStep::for_skill("analyze"));
///
/// assert!(workflow.validate().is_ok());
/// assert_eq!(workflow.step_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub initial_step: StepName,
    pub steps: Vec<WorkflowStep>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl WorkflowDefinition {
    /// Creates an empty workflow starting at `initial_step`.
    pub fn new(name: impl Into<String>, initial_step: impl Into<StepName>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: String::new(),
            initial_step: initial_step.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Looks a step up by name.
    pub fn find_step(&self, name: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.name.as_str() == name)
    }

    /// Returns `true` if a step with the given name exists.
    pub fn has_step(&self, name: &str) -> bool {
        self.find_step(name).is_some()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Distinct skill names referenced by the graph.
    pub fn skill_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .map(|s| s.skill.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Checks the graph is closed: every transition and the initial step exist.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Configuration(
                "Workflow name must not be empty".to_string(),
            ));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::Configuration(format!(
                "Workflow '{}' has no steps",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if step.skill.trim().is_empty() {
                return Err(WorkflowError::Configuration(format!(
                    "Step '{}' does not name a skill",
                    step.name
                )));
            }
            if !names.insert(step.name.as_str()) {
                return Err(WorkflowError::DuplicateStep(step.name.clone()));
            }
        }

        if !names.contains(self.initial_step.as_str()) {
            return Err(WorkflowError::StepNotFound(self.initial_step.clone()));
        }

        for step in &self.steps {
            for target in step.transitions() {
                if !names.contains(target.as_str()) {
                    return Err(WorkflowError::InvalidTransition {
                        step: step.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
