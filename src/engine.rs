//! Step-by-step driver for workflow graphs with pause and resume.

use crate::codes;
use crate::config::WorkflowConfig;
use crate::executor::{ExecuteOptions, SkillExecutor};
use crate::state::StateStore;
use chrono::Utc;
use serde_json::json;
use skillflow_core::value::merge_into;
use skillflow_core::{
    ExecutionStatus, OutputCode, SkillContext, SkillInput, SkillOutput, StepRecord, ValueMap,
    WorkflowDefinition, WorkflowError, WorkflowExecution, WorkflowStep,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Drives [`WorkflowDefinition`]s through the [`SkillExecutor`].
///
/// An execution moves `running → paused | success | failed`. A paused
/// execution goes back to `running` through [`resume`](Self::resume) or
/// [`continue_with`](Self::continue_with). Steps run strictly one after
/// another; distinct executions are independent.
///
/// The execution record is saved after every step when `auto_save` is on,
/// and always when the run pauses or ends. Store failures are logged and
/// otherwise ignored.
///
/// # Examples
///
/// ```
/// use skillflow::{InMemoryStateStore, SkillExecutor, SkillRegistry, WorkflowExecutor};
/// use skillflow_core::{
///     OutputCode, Skill, SkillError, SkillInput, SkillMeta, SkillOutput, WorkflowDefinition,
///     WorkflowStep,
/// };
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Greet(SkillMeta);
///
/// #[async_trait]
/// impl Skill for Greet {
///     fn meta(&self) -> &SkillMeta { &self.0 }
///     async fn execute(&self, _input: &SkillInput) -> Result<SkillOutput, SkillError> {
///         Ok(SkillOutput::success("hello").with_data("greeting", "hello".into()))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut registry = SkillRegistry::new();
/// registry.register(Greet(SkillMeta::new("greet", "demo"))).unwrap();
///
/// let engine = WorkflowExecutor::new(
///     Arc::new(SkillExecutor::new(Arc::new(registry))),
///     Arc::new(InMemoryStateStore::new()),
/// );
/// let workflow = WorkflowDefinition::new("hello", "greet").step(WorkflowStep::for_skill("greet"));
///
/// let out = engine.execute(&workflow, SkillInput::new("t-1", "say hello")).await;
/// assert_eq!(out.code, OutputCode::Success);
/// assert_eq!(out.data["context"]["writable"]["greeting"], "hello");
/// # }
/// ```
pub struct WorkflowExecutor {
    executor: Arc<SkillExecutor>,
    store: Arc<dyn StateStore>,
    config: WorkflowConfig,
    workflows: RwLock<HashMap<String, Arc<WorkflowDefinition>>>,
}

impl fmt::Debug for WorkflowExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowExecutor")
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkflowExecutor {
    pub fn new(executor: Arc<SkillExecutor>, store: Arc<dyn StateStore>) -> Self {
        Self::with_config(executor, store, WorkflowConfig::default())
    }

    pub fn with_config(
        executor: Arc<SkillExecutor>,
        store: Arc<dyn StateStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            executor,
            store,
            config,
            workflows: RwLock::new(HashMap::new()),
        }
    }

    pub fn executor(&self) -> &Arc<SkillExecutor> {
        &self.executor
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Validates `workflow` and makes it available to [`resume`](Self::resume).
    ///
    /// A definition with the same name replaces the previous one.
    pub async fn register_workflow(&self, workflow: WorkflowDefinition) -> Result<(), WorkflowError> {
        self.check(&workflow)?;
        self.catalogue(&workflow).await;
        Ok(())
    }

    async fn catalogue(&self, workflow: &WorkflowDefinition) {
        self.workflows
            .write()
            .await
            .insert(workflow.name.clone(), Arc::new(workflow.clone()));
    }

    fn check(&self, workflow: &WorkflowDefinition) -> Result<(), WorkflowError> {
        workflow.validate()?;
        if self.config.validate_skills {
            let registry = self.executor.registry();
            if let Some(missing) = workflow
                .skill_names()
                .into_iter()
                .find(|name| !registry.contains(name))
            {
                return Err(WorkflowError::Configuration(format!(
                    "Skill '{}' is not registered",
                    missing
                )));
            }
        }
        Ok(())
    }

    /// Loads a stored execution record.
    pub async fn get_execution(&self, trace_id: &str) -> Option<WorkflowExecution> {
        match self.store.load(trace_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(trace_id, error = %e, "Failed to load execution");
                None
            }
        }
    }

    /// Starts a new execution of `workflow`.
    ///
    /// An invalid graph is rejected before any step runs and nothing is
    /// persisted. A blank `input.trace_id` is replaced with a fresh id.
    pub async fn execute(&self, workflow: &WorkflowDefinition, input: SkillInput) -> SkillOutput {
        if let Err(e) = self.check(workflow) {
            warn!(workflow = %workflow.name, error = %e, "Rejected workflow");
            return SkillOutput::fatal_with_code(
                codes::INVALID_WORKFLOW,
                format!("Invalid workflow '{}': {}", workflow.name, e),
            );
        }
        self.catalogue(workflow).await;

        let trace_id = if input.trace_id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            input.trace_id.clone()
        };
        info!(workflow = %workflow.name, trace_id = %trace_id, "Starting workflow");

        let mut execution = WorkflowExecution::start(workflow, trace_id, input);
        self.drive(workflow, &mut execution).await
    }

    /// Continues a paused execution without new input.
    pub async fn resume(&self, trace_id: &str) -> SkillOutput {
        self.continue_with(trace_id, ValueMap::new()).await
    }

    /// Merges `user_input` into the writable context of a paused execution
    /// and continues it from its current step.
    ///
    /// An execution that is not paused is answered with `400` and left
    /// untouched.
    pub async fn continue_with(&self, trace_id: &str, user_input: ValueMap) -> SkillOutput {
        let mut execution = match self.store.load(trace_id).await {
            Ok(Some(execution)) => execution,
            Ok(None) => {
                return SkillOutput::fatal_with_code(
                    codes::EXECUTION_NOT_FOUND,
                    format!("Execution not found: {}", trace_id),
                )
            }
            Err(e) => {
                warn!(trace_id, error = %e, "Failed to load execution");
                return SkillOutput::fatal_with_code(
                    codes::STATE_UNAVAILABLE,
                    format!("Failed to load execution '{}': {}", trace_id, e),
                );
            }
        };

        if execution.status != ExecutionStatus::Paused {
            return SkillOutput::retryable(format!(
                "Execution '{}' is {} and cannot be resumed",
                trace_id, execution.status
            ))
            .with_data("status", json!(execution.status));
        }

        let workflow = self
            .workflows
            .read()
            .await
            .get(&execution.workflow_name)
            .cloned();
        let Some(workflow) = workflow else {
            return SkillOutput::fatal_with_code(
                codes::WORKFLOW_NOT_FOUND,
                format!("Workflow not found: {}", execution.workflow_name),
            );
        };

        info!(
            workflow = %workflow.name,
            trace_id,
            step = ?execution.current_step.as_ref().map(|s| s.as_str()),
            "Resuming workflow"
        );
        merge_into(&mut execution.context.writable, &user_input);
        execution.status = ExecutionStatus::Running;
        execution.touch();
        self.drive(&workflow, &mut execution).await
    }

    async fn drive(&self, workflow: &WorkflowDefinition, execution: &mut WorkflowExecution) -> SkillOutput {
        let mut steps_run = 0u32;

        while let Some(step_name) = execution.current_step.clone() {
            if steps_run >= self.config.max_steps {
                let message = format!(
                    "Workflow '{}' exceeded {} steps",
                    workflow.name, self.config.max_steps
                );
                return self
                    .fail(execution, SkillOutput::fatal_with_code(codes::MAX_STEPS_EXCEEDED, message))
                    .await;
            }

            let Some(step) = workflow.find_step(step_name.as_str()) else {
                let message = format!("Step '{}' not found in workflow '{}'", step_name, workflow.name);
                return self
                    .fail(execution, SkillOutput::fatal_with_code(codes::STEP_NOT_FOUND, message))
                    .await;
            };

            let failures = execution.failures(step.name.as_str());
            if failures > step.retry {
                let message = format!(
                    "Step '{}' exhausted its retry budget after {} failure(s)",
                    step.name, failures
                );
                return self
                    .fail(
                        execution,
                        SkillOutput::fatal_with_code(codes::RETRY_EXHAUSTED, message)
                            .with_data("step", json!(step.name)),
                    )
                    .await;
            }

            let visit = execution.record_visit(&step.name);
            let input = execution.prepare_step_input(step);
            debug!(step = %step.name, skill = %step.skill, visit, "Running step");

            let started_at = Utc::now();
            let output = self
                .executor
                .execute_with(&step.skill, input, ExecuteOptions::new().max_retries(step.retry))
                .await;
            steps_run += 1;

            execution.executed_steps.push(StepRecord {
                step: step.name.clone(),
                skill: step.skill.clone(),
                code: output.code,
                message: output.message.clone(),
                visit,
                started_at,
                finished_at: Utc::now(),
            });

            match output.code {
                OutputCode::Success => {
                    info!("Step '{}' completed successfully", step.name);
                    execution.context.absorb(&output.data);
                    self.publish_results(step, &output.data, &mut execution.context);
                    execution.current_step = step.on_success.clone();
                }
                OutputCode::NeedsInput => {
                    info!("Step '{}' needs input, pausing", step.name);
                    execution.context.absorb(&output.data);
                    execution.current_step = step.on_success.clone();
                    execution.status = ExecutionStatus::Paused;
                    execution.touch();
                    self.persist(execution).await;
                    return self.finish(execution, output);
                }
                OutputCode::RetryableFailure | OutputCode::FatalFailure => {
                    execution.record_failure(&step.name);
                    execution.last_error = Some(output.message.clone());
                    match &step.on_fail {
                        Some(target) => {
                            warn!(
                                "Step '{}' failed ({}), continuing with '{}'",
                                step.name, output.code, target
                            );
                            execution.current_step = Some(target.clone());
                        }
                        None if output.code == OutputCode::RetryableFailure => {
                            let message =
                                format!("Step '{}' failed: {}", step.name, output.message);
                            let fatal = SkillOutput::fatal_with_code(codes::STEP_FAILED, message)
                                .with_data("step", json!(step.name));
                            return self.fail(execution, fatal).await;
                        }
                        None => return self.fail(execution, output).await,
                    }
                }
            }

            execution.touch();
            if self.config.auto_save {
                self.persist(execution).await;
            }
        }

        execution.status = ExecutionStatus::Success;
        execution.touch();
        self.persist(execution).await;
        info!(workflow = %workflow.name, trace_id = %execution.trace_id, "Workflow completed");

        self.finish(
            execution,
            SkillOutput::success(format!("Workflow '{}' completed", workflow.name)),
        )
    }

    async fn fail(&self, execution: &mut WorkflowExecution, output: SkillOutput) -> SkillOutput {
        warn!(
            workflow = %execution.workflow_name,
            trace_id = %execution.trace_id,
            "Workflow failed: {}",
            output.message
        );
        execution.status = ExecutionStatus::Failed;
        execution.last_error = Some(output.message.clone());
        execution.touch();
        self.persist(execution).await;
        self.finish(execution, output)
    }

    /// Adds the execution summary to `output`, keeping its own keys.
    fn finish(&self, execution: &WorkflowExecution, output: SkillOutput) -> SkillOutput {
        let mut data = execution.summary();
        merge_into(&mut data, &output.data);
        SkillOutput { data, ..output }
    }

    /// Copies well-known result keys of a successful step into `read_only`.
    fn publish_results(&self, step: &WorkflowStep, data: &ValueMap, context: &mut SkillContext) {
        for (key, value) in data {
            let listed = self.config.read_only_keys.contains(key) || step.publish.contains(key);
            if listed && context.read_only.publish(key.clone(), value.clone()) {
                debug!(key = %key, step = %step.name, "Published read-only result");
            }
        }
    }

    async fn persist(&self, execution: &WorkflowExecution) {
        if let Err(e) = self.store.save(execution).await {
            warn!(trace_id = %execution.trace_id, error = %e, "Failed to persist execution");
        }
    }
}
