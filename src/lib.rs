//! # skillflow
//!
//! Execution core for pipelines built out of self-contained units of work
//! called *skills*.
//!
//! A skill takes a [`SkillInput`] and answers with a [`SkillOutput`] whose
//! code tells the driver what to do next: `200` continue, `300` pause for
//! user input, `400` recoverable failure, `500` fatal failure.
//!
//! ## Features
//!
//! - **Registry**: skills keyed by name, indexed by category, searchable
//! - **Executor**: per-attempt timeout, execution-level retry, lifecycle hooks and events
//! - **Composer**: sequence, parallel, conditional and loop combinators
//! - **Workflows**: step graphs with pause, resume and persisted execution records
//! - **Utilities**: a TTL/LRU [`Cache`] and an exponential-backoff [`RetryStrategy`]
//!
//! ## Quick Start
//!
//! ```rust
//! use skillflow::prelude::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! define_skill!(Collect, "collect", "requirements");
//! define_skill!(Analyze, "analyze", "analysis");
//!
//! #[async_trait]
//! impl Skill for Collect {
//!     fn meta(&self) -> &SkillMeta { &self.meta }
//!
//!     async fn execute(&self, input: &SkillInput) -> Result<SkillOutput, SkillError> {
//!         match input.context.get("goal") {
//!             Some(goal) => Ok(SkillOutput::success("collected").with_data("requirements", goal.clone())),
//!             None => Ok(SkillOutput::needs_input("What should be built?")),
//!         }
//!     }
//! }
//!
//! #[async_trait]
//! impl Skill for Analyze {
//!     fn meta(&self) -> &SkillMeta { &self.meta }
//!
//!     async fn execute(&self, _input: &SkillInput) -> Result<SkillOutput, SkillError> {
//!         Ok(SkillOutput::success("analyzed").with_data("analysis", "ok".into()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut registry = SkillRegistry::new();
//! registry.register(Collect::default()).expect("unique name");
//! registry.register(Analyze::default()).expect("unique name");
//!
//! let engine = WorkflowExecutor::new(
//!     Arc::new(SkillExecutor::new(Arc::new(registry))),
//!     Arc::new(InMemoryStateStore::new()),
//! );
//!
//! let workflow = WorkflowDefinition::new("delivery", "collect")
//!     .step(WorkflowStep::for_skill("collect").on_success("analyze"))
//!     .step(WorkflowStep::for_skill("analyze"));
//!
//! let out = engine.execute(&workflow, SkillInput::new("t-1", "build a CLI")).await;
//! assert_eq!(out.code, OutputCode::NeedsInput);
//!
//! let mut answer = ValueMap::new();
//! answer.insert("goal".into(), "a todo CLI".into());
//! let out = engine.continue_with("t-1", answer).await;
//! assert_eq!(out.code, OutputCode::Success);
//! # }
//! ```
//!
//! Note that the paused step is not re-run: the pause happens after
//! `collect` answered `300`, and the run resumes at its `on_success`
//! target.
//!
//! ## Error Handling
//!
//! Public entry points never panic and never return `Err`; failures come
//! back as fatal outputs with a stable tag in `data.error` (see [`codes`]).
//!
//! ```rust
//! use skillflow::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let executor = SkillExecutor::new(Arc::new(SkillRegistry::new()));
//! let out = executor.execute("deploy", SkillInput::new("t-1", "ship")).await;
//!
//! match out.error_code() {
//!     Some(skillflow::codes::SKILL_NOT_FOUND) => eprintln!("{}", out.message),
//!     other => eprintln!("unexpected: {:?}", other),
//! }
//! # }
//! ```

pub mod codes;
mod cache;
mod composer;
mod config;
mod engine;
mod error;
mod executor;
mod registry;
mod retry;
mod state;

pub mod prelude;

pub use cache::{Cache, CacheStats, KeyPattern};
pub use composer::{SequenceOptions, SkillComposer};
pub use config::{CacheConfig, EngineConfig, ExecutorConfig, RetryConfig, WorkflowConfig};
pub use engine::WorkflowExecutor;
pub use error::{ConfigError, RegistryError, RetryConfigError, StateError};
pub use executor::{AfterHook, BeforeHook, ErrorHook, ExecuteOptions, SkillEvent, SkillExecutor};
pub use registry::{RegistryStats, SkillRegistry};
pub use retry::{Classify, RetryFailure, RetryOutcome, RetryStrategy};
pub use state::{InMemoryStateStore, StateStore};

pub use skillflow_core::{
    validator, value, ContractError, ErrorKind, ExecutionStatus, OutputCode, ReadOnlyContext,
    Skill, SkillContext, SkillError, SkillInput, SkillMeta, SkillOutput, StepName, StepRecord,
    TaskSpec, Value, ValueMap, WorkflowDefinition, WorkflowError, WorkflowExecution,
    WorkflowStep,
};

/// Defines a skill struct carrying its [`SkillMeta`].
///
/// The struct gets:
/// - a private `meta` field built from the given name and category
/// - `const NAME: &'static str`
/// - `Debug` derive and a `Default` implementation
///
/// # Example
///
/// ```rust
/// use skillflow::define_skill;
///
/// define_skill!(Lint, "lint", "testing");
/// assert_eq!(Lint::NAME, "lint");
/// ```
#[macro_export]
macro_rules! define_skill {
    ($name:ident, $skill:literal, $category:literal) => {
        #[derive(Debug)]
        pub struct $name {
            meta: $crate::SkillMeta,
        }

        impl $name {
            /// Skill name as a compile-time constant
            #[allow(dead_code)]
            pub const NAME: &'static str = $skill;
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    meta: $crate::SkillMeta::new($skill, $category),
                }
            }
        }
    };
}
