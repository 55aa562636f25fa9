use async_trait::async_trait;
use serde_json::json;
use skillflow::prelude::*;
use skillflow::{codes, ExecutionStatus, ExecutorConfig, StepName};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio_test::assert_ok;

/// Answers with a fixed output and counts its calls.
struct Scripted {
    meta: SkillMeta,
    output: SkillOutput,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Skill for Scripted {
    fn meta(&self) -> &SkillMeta {
        &self.meta
    }

    async fn execute(&self, _input: &SkillInput) -> Result<SkillOutput, SkillError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

/// Fails with an error for the first `failures` calls.
struct Flaky {
    meta: SkillMeta,
    failures: u32,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Skill for Flaky {
    fn meta(&self) -> &SkillMeta {
        &self.meta
    }

    async fn execute(&self, _input: &SkillInput) -> Result<SkillOutput, SkillError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(SkillError::Transient(format!("connection reset #{}", call)))
        } else {
            Ok(SkillOutput::success("recovered"))
        }
    }
}

struct Harness {
    engine: WorkflowExecutor,
    store: Arc<InMemoryStateStore>,
    calls: Vec<(&'static str, Arc<AtomicU32>)>,
}

impl Harness {
    fn new(skills: Vec<(&'static str, SkillOutput)>) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut registry = SkillRegistry::new();
        let mut calls = Vec::new();
        for (name, output) in skills {
            let counter = Arc::new(AtomicU32::new(0));
            registry
                .register(Scripted {
                    meta: SkillMeta::new(name, "scenario"),
                    output,
                    calls: Arc::clone(&counter),
                })
                .unwrap();
            calls.push((name, counter));
        }

        let executor = SkillExecutor::with_config(
            Arc::new(registry),
            ExecutorConfig {
                retry_delay_ms: 0,
                ..ExecutorConfig::default()
            },
        );
        let store = Arc::new(InMemoryStateStore::new());
        let engine = WorkflowExecutor::new(Arc::new(executor), store.clone());
        Self {
            engine,
            store,
            calls,
        }
    }

    fn calls(&self, name: &str) -> u32 {
        self.calls
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

fn two_steps() -> WorkflowDefinition {
    WorkflowDefinition::new("two-steps", "a")
        .step(WorkflowStep::for_skill("a").on_success("b"))
        .step(WorkflowStep::for_skill("b"))
}

#[tokio::test]
async fn test_linear_workflow_succeeds() {
    let harness = Harness::new(vec![
        ("a", SkillOutput::success("a done").with_data("requirements", json!(["login"]))),
        ("b", SkillOutput::success("b done").with_data("analysis", json!("small"))),
    ]);

    let out = harness
        .engine
        .execute(&two_steps(), SkillInput::new("trace-a", "deliver"))
        .await;

    assert_eq!(out.code, OutputCode::Success);
    assert_eq!(out.data["traceId"], json!("trace-a"));
    assert_eq!(out.data["status"], json!("success"));
    assert_eq!(out.data["executedSteps"], json!(["a", "b"]));
    assert_eq!(out.data["context"]["writable"]["analysis"], json!("small"));

    let record = assert_ok!(harness.store.load("trace-a").await).unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert_eq!(record.current_step, None);
    assert_eq!(
        record.context.read_only.get("requirements"),
        Some(&json!(["login"]))
    );
}

#[tokio::test]
async fn test_pause_and_resume_continues_from_transition() {
    let harness = Harness::new(vec![
        ("a", SkillOutput::needs_input("Which database?").with_data("question", json!("db"))),
        ("b", SkillOutput::success("b done")),
    ]);

    let out = harness
        .engine
        .execute(&two_steps(), SkillInput::new("trace-b", "deliver"))
        .await;
    assert_eq!(out.code, OutputCode::NeedsInput);
    assert_eq!(out.message, "Which database?");
    assert_eq!(out.data["status"], json!("paused"));

    let record = harness.store.load("trace-b").await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Paused);
    assert_eq!(record.current_step, Some(StepName::new("b")));
    assert_eq!(record.context.writable.get("question"), Some(&json!("db")));

    let mut answer = ValueMap::new();
    answer.insert("database".to_string(), json!("postgres"));
    let out = harness.engine.continue_with("trace-b", answer).await;

    assert_eq!(out.code, OutputCode::Success);
    assert_eq!(out.data["executedSteps"], json!(["a", "b"]));
    assert_eq!(out.data["context"]["writable"]["database"], json!("postgres"));
    assert_eq!(harness.calls("a"), 1);
    assert_eq!(harness.calls("b"), 1);
}

#[tokio::test]
async fn test_failure_loop_is_bounded_by_step_retry() {
    let harness = Harness::new(vec![("a", SkillOutput::retryable("tests still red"))]);
    let workflow = WorkflowDefinition::new("self-heal", "a")
        .step(WorkflowStep::for_skill("a").on_fail("a").with_retry(2));

    let out = harness
        .engine
        .execute(&workflow, SkillInput::new("trace-c", "deliver"))
        .await;

    assert_eq!(out.code, OutputCode::FatalFailure);
    assert_eq!(out.error_code(), Some(codes::RETRY_EXHAUSTED));
    assert_eq!(out.data["status"], json!("failed"));
    assert_eq!(harness.calls("a"), 3);

    let record = harness.store.load("trace-c").await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert_eq!(record.executed_step_names(), vec!["a", "a", "a"]);
    assert_eq!(record.failures("a"), 3);
    assert_eq!(record.visits("a"), 3);
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn test_business_failure_without_on_fail_fails() {
    let harness = Harness::new(vec![("a", SkillOutput::retryable("lint errors"))]);
    let workflow = WorkflowDefinition::new("strict", "a").step(WorkflowStep::for_skill("a"));

    let out = harness
        .engine
        .execute(&workflow, SkillInput::new("trace-d", "deliver"))
        .await;

    assert_eq!(out.code, OutputCode::FatalFailure);
    assert_eq!(out.error_code(), Some(codes::STEP_FAILED));
    assert!(out.message.contains("lint errors"));
}

#[tokio::test]
async fn test_invalid_graph_runs_nothing() {
    let harness = Harness::new(vec![("a", SkillOutput::success("a done"))]);
    let workflow = WorkflowDefinition::new("broken", "a")
        .step(WorkflowStep::for_skill("a").on_success("missing"));

    let out = harness
        .engine
        .execute(&workflow, SkillInput::new("trace-e", "deliver"))
        .await;

    assert_eq!(out.code, OutputCode::FatalFailure);
    assert_eq!(out.error_code(), Some(codes::INVALID_WORKFLOW));
    assert_eq!(harness.calls("a"), 0);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_resume_rejects_finished_execution_without_changes() {
    let harness = Harness::new(vec![
        ("a", SkillOutput::success("a done")),
        ("b", SkillOutput::success("b done")),
    ]);
    harness
        .engine
        .execute(&two_steps(), SkillInput::new("trace-f", "deliver"))
        .await;
    let before = harness.store.load("trace-f").await.unwrap();

    let out = harness.engine.resume("trace-f").await;

    assert_eq!(out.code, OutputCode::RetryableFailure);
    assert_eq!(out.data["status"], json!("success"));
    assert_eq!(harness.store.load("trace-f").await.unwrap(), before);
    assert_eq!(harness.calls("a"), 1);
}

#[tokio::test]
async fn test_resume_unknown_trace() {
    let harness = Harness::new(vec![]);
    let out = harness.engine.resume("nope").await;

    assert_eq!(out.code, OutputCode::FatalFailure);
    assert_eq!(out.error_code(), Some(codes::EXECUTION_NOT_FOUND));
}

#[tokio::test]
async fn test_executor_retries_min_of_failures_and_budget() {
    let max_retries = 2;
    for failures in 0..5u32 {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = SkillRegistry::new();
        registry
            .register(Flaky {
                meta: SkillMeta::new("flaky", "scenario"),
                failures,
                calls: Arc::clone(&calls),
            })
            .unwrap();
        let executor = SkillExecutor::with_config(
            Arc::new(registry),
            ExecutorConfig {
                retry_delay_ms: 0,
                ..ExecutorConfig::default()
            },
        );

        let out = executor
            .execute_with(
                "flaky",
                SkillInput::new("trace-r", "retry"),
                ExecuteOptions::new().max_retries(max_retries),
            )
            .await;

        let retries = calls.load(Ordering::SeqCst) - 1;
        assert_eq!(retries, failures.min(max_retries), "failures = {}", failures);
        if failures > max_retries {
            assert_eq!(out.code, OutputCode::FatalFailure);
            assert_eq!(out.data["attempts"], json!(max_retries + 1));
        } else {
            assert_eq!(out.code, OutputCode::Success);
        }
    }
}
