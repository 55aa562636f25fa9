//! Persisted record of one workflow run.

use crate::context::SkillContext;
use crate::input::{SkillInput, TaskSpec};
use crate::output::OutputCode;
use crate::step::{StepName, WorkflowStep};
use crate::value::{overlay, Value, ValueMap};
use crate::workflow::WorkflowDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    /// Waiting for external input; resumable.
    Paused,
    Success,
    Failed,
}

impl ExecutionStatus {
    /// `success` and `failed` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Paused => "paused",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One entry of the executed-steps history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: StepName,
    pub skill: String,
    pub code: OutputCode,
    pub message: String,
    /// 1-based visit number of this step within the execution.
    pub visit: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Mutable run record, persisted after every step and keyed by trace id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_name: String,
    pub workflow_version: String,
    pub trace_id: String,
    pub current_step: Option<StepName>,
    pub status: ExecutionStatus,
    pub context: SkillContext,
    /// Configuration carried from the initial input.
    #[serde(default)]
    pub config: ValueMap,
    /// Task carried between steps; its params accumulate step overlays.
    #[serde(default)]
    pub task: TaskSpec,
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default)]
    pub executed_steps: Vec<StepRecord>,
    /// How many times each step has been entered.
    #[serde(default)]
    pub step_visits: BTreeMap<String, u32>,
    /// How many times each step has ended with `400` or `500`.
    #[serde(default)]
    pub step_failures: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl WorkflowExecution {
    /// Creates a running record positioned at the workflow's initial step.
    pub fn start(workflow: &WorkflowDefinition, trace_id: impl Into<String>, input: SkillInput) -> Self {
        let now = Utc::now();
        Self {
            workflow_name: workflow.name.clone(),
            workflow_version: workflow.version.clone(),
            trace_id: trace_id.into(),
            current_step: Some(workflow.initial_step.clone()),
            status: ExecutionStatus::Running,
            context: input.context,
            config: input.config,
            task: input.task,
            snapshot_path: input.snapshot_path,
            executed_steps: Vec::new(),
            step_visits: BTreeMap::new(),
            step_failures: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Names of executed steps, in order.
    pub fn executed_step_names(&self) -> Vec<&str> {
        self.executed_steps.iter().map(|r| r.step.as_str()).collect()
    }

    /// Times `step` has been entered so far.
    pub fn visits(&self, step: &str) -> u32 {
        self.step_visits.get(step).copied().unwrap_or(0)
    }

    /// Counts a new visit of `step` and returns the updated count.
    pub fn record_visit(&mut self, step: &StepName) -> u32 {
        let count = self.step_visits.entry(step.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Times `step` has failed so far.
    pub fn failures(&self, step: &str) -> u32 {
        self.step_failures.get(step).copied().unwrap_or(0)
    }

    /// Counts a failure of `step` and returns the updated count.
    pub fn record_failure(&mut self, step: &StepName) -> u32 {
        let count = self.step_failures.entry(step.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Builds the input for `step`.
    ///
    /// Static step params are overlaid onto the carried task params, and the
    /// result is carried on to the next step.
    pub fn prepare_step_input(&mut self, step: &WorkflowStep) -> SkillInput {
        self.task.params = overlay(&self.task.params, &step.params);
        let visit = self.visits(step.name.as_str());

        let task = TaskSpec {
            id: format!("{}:{}:{}", self.trace_id, step.name, visit),
            name: step.name.to_string(),
            target: self.task.target.clone(),
            params: self.task.params.clone(),
            timeout_ms: self.task.timeout_ms,
            max_retry: Some(step.retry),
        };

        SkillInput {
            config: self.config.clone(),
            context: self.context.clone(),
            task,
            snapshot_path: self.snapshot_path.clone(),
            trace_id: self.trace_id.clone(),
        }
    }

    /// Marks the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Caller-facing summary used as the `data` of workflow outputs.
    pub fn summary(&self) -> ValueMap {
        let mut data = ValueMap::new();
        data.insert("traceId".to_string(), Value::String(self.trace_id.clone()));
        data.insert(
            "workflow".to_string(),
            Value::String(self.workflow_name.clone()),
        );
        data.insert("status".to_string(), Value::String(self.status.to_string()));
        data.insert(
            "currentStep".to_string(),
            self.current_step
                .as_ref()
                .map(|s| Value::String(s.to_string()))
                .unwrap_or(Value::Null),
        );
        data.insert(
            "executedSteps".to_string(),
            Value::Array(
                self.executed_step_names()
                    .into_iter()
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
        );
        data.insert(
            "context".to_string(),
            serde_json::to_value(&self.context).unwrap_or(Value::Null),
        );
        data
    }
}
