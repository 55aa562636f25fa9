//! Runs one named skill against one input.

use crate::codes;
use crate::config::ExecutorConfig;
use crate::registry::SkillRegistry;
use serde_json::json;
use skillflow_core::validator::{validate_input, validate_output};
use skillflow_core::{OutputCode, Skill, SkillError, SkillInput, SkillOutput};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{info, warn};

pub type BeforeHook = Arc<dyn Fn(&str, &SkillInput, u32) + Send + Sync>;
pub type AfterHook = Arc<dyn Fn(&str, &SkillOutput, u32) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&str, &SkillError, u32) + Send + Sync>;

/// Per-call overrides and lifecycle hooks.
///
/// Hooks run synchronously on the caller's task around each attempt and
/// receive the skill name and the 1-based attempt number. Every attempt
/// gets `before` and then exactly one of `after` or `on_error`; an output
/// that breaks the contract reaches `after` as the fatal output it becomes.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub before: Option<BeforeHook>,
    pub after: Option<AfterHook>,
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn before(mut self, hook: impl Fn(&str, &SkillInput, u32) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn after(mut self, hook: impl Fn(&str, &SkillOutput, u32) + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&str, &SkillError, u32) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

/// Lifecycle events published by [`SkillExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub enum SkillEvent {
    Started {
        skill: String,
        trace_id: String,
        attempt: u32,
    },
    Succeeded {
        skill: String,
        trace_id: String,
        attempt: u32,
        code: OutputCode,
        elapsed: Duration,
    },
    Failed {
        skill: String,
        trace_id: String,
        attempt: u32,
        error: String,
    },
    Retrying {
        skill: String,
        trace_id: String,
        attempt: u32,
        delay: Duration,
    },
}

/// Executes registered skills with a timeout and execution-level retry.
///
/// Only unexpected failures are retried: an `Err` from the skill, a panic,
/// or a timeout. Contractual `400`/`500` outputs are returned as they are.
/// Every path yields a [`SkillOutput`]; nothing is raised to the caller.
///
/// A timed-out attempt is not interrupted. It keeps running detached on the
/// runtime until it finishes, so skills with side effects may complete work
/// after their attempt was already counted as failed.
///
/// # Examples
///
/// ```
/// use skillflow::{SkillExecutor, SkillRegistry};
/// use skillflow_core::{OutputCode, SkillInput};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let executor = SkillExecutor::new(Arc::new(SkillRegistry::new()));
/// let out = executor.execute("missing", SkillInput::new("t-1", "demo")).await;
///
/// assert_eq!(out.code, OutputCode::FatalFailure);
/// assert_eq!(out.error_code(), Some("SKILL_NOT_FOUND"));
/// # }
/// ```
pub struct SkillExecutor {
    registry: Arc<SkillRegistry>,
    config: ExecutorConfig,
    events: broadcast::Sender<SkillEvent>,
}

impl fmt::Debug for SkillExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillExecutor")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl SkillExecutor {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    pub fn with_config(registry: Arc<SkillRegistry>, config: ExecutorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            registry,
            config,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Subscribes to execution events.
    pub fn subscribe(&self) -> broadcast::Receiver<SkillEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SkillEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Runs `skill_name` with default options.
    pub async fn execute(&self, skill_name: &str, input: SkillInput) -> SkillOutput {
        self.execute_with(skill_name, input, ExecuteOptions::default())
            .await
    }

    /// Runs `skill_name` with per-call options.
    ///
    /// Timeout and retry budget resolve from `options`, then the input's
    /// task, then the executor config.
    pub async fn execute_with(
        &self,
        skill_name: &str,
        input: SkillInput,
        options: ExecuteOptions,
    ) -> SkillOutput {
        let Some(skill) = self.registry.get(skill_name) else {
            warn!(skill = skill_name, trace_id = %input.trace_id, "Skill not found");
            return skill_not_found(skill_name);
        };

        if let Err(e) = validate_input(&input) {
            warn!(skill = skill_name, error = %e, "Rejected input");
            return SkillOutput::fatal_with_code(
                codes::CONTRACT_VIOLATION,
                format!("Invalid input for skill '{}': {}", skill_name, e),
            );
        }

        let timeout = options
            .timeout
            .or_else(|| input.task.timeout())
            .unwrap_or_else(|| self.config.default_timeout());
        let max_retries = options
            .max_retries
            .or(input.task.max_retry)
            .unwrap_or(self.config.default_max_retries);
        let trace_id = input.trace_id.clone();
        let input = Arc::new(input);
        let mut last_error = None;

        for attempt in 1..=max_retries.saturating_add(1) {
            if let Some(before) = &options.before {
                before(skill_name, &input, attempt);
            }
            self.emit(SkillEvent::Started {
                skill: skill_name.to_string(),
                trace_id: trace_id.clone(),
                attempt,
            });

            let started = Instant::now();
            match invoke(&skill, Arc::clone(&input), Some(timeout)).await {
                Ok(output) => {
                    if let Err(e) = validate_output(&output) {
                        warn!(skill = skill_name, trace_id = %trace_id, error = %e, "Skill returned an invalid output");
                        self.emit(SkillEvent::Failed {
                            skill: skill_name.to_string(),
                            trace_id,
                            attempt,
                            error: e.to_string(),
                        });
                        let fatal = SkillOutput::fatal_with_code(
                            codes::INVALID_OUTPUT,
                            format!("Skill '{}' returned an invalid output: {}", skill_name, e),
                        );
                        if let Some(after) = &options.after {
                            after(skill_name, &fatal, attempt);
                        }
                        return fatal;
                    }

                    let elapsed = started.elapsed();
                    info!(
                        skill = skill_name,
                        trace_id = %trace_id,
                        attempt,
                        code = %output.code,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Skill completed"
                    );
                    self.emit(SkillEvent::Succeeded {
                        skill: skill_name.to_string(),
                        trace_id,
                        attempt,
                        code: output.code,
                        elapsed,
                    });
                    if let Some(after) = &options.after {
                        after(skill_name, &output, attempt);
                    }
                    return output;
                }
                Err(error) => {
                    warn!(skill = skill_name, trace_id = %trace_id, attempt, error = %error, "Skill attempt failed");
                    if let Some(on_error) = &options.on_error {
                        on_error(skill_name, &error, attempt);
                    }
                    self.emit(SkillEvent::Failed {
                        skill: skill_name.to_string(),
                        trace_id: trace_id.clone(),
                        attempt,
                        error: error.to_string(),
                    });

                    if attempt <= max_retries {
                        let delay = self.config.retry_delay();
                        info!(
                            skill = skill_name,
                            "Skill '{}' failed, retrying ({}/{})",
                            skill_name,
                            attempt,
                            max_retries
                        );
                        self.emit(SkillEvent::Retrying {
                            skill: skill_name.to_string(),
                            trace_id: trace_id.clone(),
                            attempt,
                            delay,
                        });
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_error = Some(error);
                }
            }
        }

        let attempts = max_retries.saturating_add(1);
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(skill = skill_name, trace_id = %trace_id, attempts, "Skill failed after all retries");
        SkillOutput::fatal_with_code(
            codes::EXECUTION_FAILED,
            format!(
                "Skill '{}' failed after {} attempt(s): {}",
                skill_name, attempts, detail
            ),
        )
        .with_data("attempts", json!(attempts))
        .with_data("lastError", json!(detail))
    }
}

/// Fatal output for an unregistered skill name.
pub(crate) fn skill_not_found(skill_name: &str) -> SkillOutput {
    SkillOutput::fatal_with_code(
        codes::SKILL_NOT_FOUND,
        format!("Skill not found: {}", skill_name),
    )
    .with_data("skill", json!(skill_name))
}

/// Runs one attempt of `skill` on its own task.
///
/// A panic surfaces as [`SkillError::Panicked`]. On timeout the task is
/// detached, not aborted.
pub(crate) async fn invoke(
    skill: &Arc<dyn Skill>,
    input: Arc<SkillInput>,
    timeout: Option<Duration>,
) -> Result<SkillOutput, SkillError> {
    let task_skill = Arc::clone(skill);
    let handle = tokio::spawn(async move { task_skill.execute(&input).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(SkillError::Timeout {
                    skill: skill.name().to_string(),
                    timeout: limit,
                })
            }
        },
        None => handle.await,
    };

    joined.unwrap_or_else(|e| Err(SkillError::Panicked(describe_join_error(e))))
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
