//! Stable `data.error` tags carried by fatal outputs the engine produces.

pub const SKILL_NOT_FOUND: &str = "SKILL_NOT_FOUND";
pub const CONTRACT_VIOLATION: &str = "CONTRACT_VIOLATION";
pub const INVALID_OUTPUT: &str = "INVALID_OUTPUT";
pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";

pub const INVALID_WORKFLOW: &str = "INVALID_WORKFLOW";
pub const WORKFLOW_NOT_FOUND: &str = "WORKFLOW_NOT_FOUND";
pub const EXECUTION_NOT_FOUND: &str = "EXECUTION_NOT_FOUND";
pub const STEP_NOT_FOUND: &str = "STEP_NOT_FOUND";
/// A step returned `400` and has no `on_fail` transition.
///
/// A missing `on_fail` is not treated as a terminal success: the execution
/// is marked failed so a business failure never completes a workflow.
pub const STEP_FAILED: &str = "STEP_FAILED";
pub const RETRY_EXHAUSTED: &str = "RETRY_EXHAUSTED";
pub const MAX_STEPS_EXCEEDED: &str = "MAX_STEPS_EXCEEDED";
pub const STATE_UNAVAILABLE: &str = "STATE_UNAVAILABLE";
