//! Contract types for the skillflow execution core.
//!
//! This crate has no runtime dependencies. Skill authors depend on it to
//! implement [`Skill`]; front ends depend on it to build workflows and read
//! execution records.
//!
//! # Core Types
//!
//! - [`Skill`] / [`SkillMeta`] - A unit of work and its description
//! - [`SkillInput`] / [`SkillContext`] - What a skill receives
//! - [`SkillOutput`] / [`OutputCode`] - What a skill returns
//! - [`WorkflowDefinition`] / [`WorkflowStep`] - Declarative step graphs
//! - [`WorkflowExecution`] - The persisted, resumable run record
//! - [`validator`] - Contract checks for inputs and outputs

mod context;
mod error;
mod execution;
mod input;
mod output;
mod skill;
mod step;
pub mod validator;
pub mod value;
mod workflow;

pub use context::{ReadOnlyContext, SkillContext};
pub use error::{ContractError, ErrorKind, SkillError, WorkflowError};
pub use execution::{ExecutionStatus, StepRecord, WorkflowExecution};
pub use input::{SkillInput, TaskSpec};
pub use output::{OutputCode, SkillOutput};
pub use skill::{Skill, SkillMeta};
pub use step::{StepName, WorkflowStep};
pub use value::{Value, ValueMap};
pub use workflow::WorkflowDefinition;
