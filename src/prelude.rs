//! Commonly used types and traits

pub use crate::define_skill;
pub use crate::executor::{ExecuteOptions, SkillExecutor};
pub use crate::registry::SkillRegistry;
pub use crate::state::{InMemoryStateStore, StateStore};
pub use crate::engine::WorkflowExecutor;
pub use skillflow_core::{
    OutputCode, Skill, SkillError, SkillInput, SkillMeta, SkillOutput, ValueMap,
    WorkflowDefinition, WorkflowStep,
};
