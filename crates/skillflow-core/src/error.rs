//! Error types shared by skills, the contract validator and workflow definitions.

use crate::step::StepName;
use std::time::Duration;
use thiserror::Error;

/// Broad classification of a failure, used to decide whether retrying can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation did not finish in time.
    Timeout,
    /// A temporary condition (network blip, busy resource).
    Transient,
    /// The request itself is malformed.
    Validation,
    /// The caller is not allowed to perform the operation.
    Permission,
    /// The target of the operation does not exist.
    NotFound,
    /// Anything not classified above.
    Unknown,
}

impl ErrorKind {
    /// Returns `true` for kinds where another attempt may succeed.
    ///
    /// Unclassified errors are treated as retryable.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Transient | ErrorKind::Unknown
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transient => "transient",
            ErrorKind::Validation => "validation",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Failure raised by a skill invocation instead of a contractual output.
///
/// The executor treats every variant as an uncaught failure: it is eligible
/// for execution-level retry and is converted to a fatal output once the
/// retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SkillError {
    /// Generic failure with a description.
    #[error("{0}")]
    Failed(String),

    /// A temporary failure; retrying is expected to help.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The invocation exceeded its time budget.
    #[error("skill '{skill}' timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Name of the skill that timed out.
        skill: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// The skill task panicked.
    #[error("skill panicked: {0}")]
    Panicked(String),

    /// The skill rejected its input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The skill was denied access to a resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A resource the skill needs does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl SkillError {
    /// Shorthand for [`SkillError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        SkillError::Failed(msg.into())
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkillError::Failed(_) | SkillError::Panicked(_) => ErrorKind::Unknown,
            SkillError::Transient(_) => ErrorKind::Transient,
            SkillError::Timeout { .. } => ErrorKind::Timeout,
            SkillError::InvalidInput(_) => ErrorKind::Validation,
            SkillError::PermissionDenied(_) => ErrorKind::Permission,
            SkillError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// A value violates the skill input/output contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContractError {
    #[error("output message must not be empty")]
    EmptyMessage,

    #[error("trace id must not be empty")]
    EmptyTraceId,

    #[error("task name must not be empty")]
    EmptyTaskName,

    #[error("unknown output code: {0}")]
    UnknownCode(i64),

    #[error("output field '{field}' is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("malformed output document: {0}")]
    Malformed(String),
}

/// Errors in a workflow definition.
///
/// Raised by [`crate::WorkflowDefinition::validate`] before any step runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkflowError {
    /// The workflow configuration is invalid.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    /// A referenced step is not part of the workflow.
    #[error("Step not found: {0}")]
    StepNotFound(StepName),

    /// Two steps share a name.
    #[error("Duplicate step: {0}")]
    DuplicateStep(StepName),

    /// A transition points at a step that does not exist.
    #[error("Step '{step}' transitions to unknown step '{target}'")]
    InvalidTransition {
        /// The step declaring the transition.
        step: StepName,
        /// The missing target.
        target: StepName,
    },
}
