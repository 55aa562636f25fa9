//! Skill output and status codes.

use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome class of a skill invocation.
///
/// Serialized as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum OutputCode {
    /// `200`
    Success,
    /// `300`: execution must pause for external input.
    NeedsInput,
    /// `400`: a business failure the workflow graph resolves.
    RetryableFailure,
    /// `500`
    FatalFailure,
}

impl OutputCode {
    pub fn as_u16(self) -> u16 {
        match self {
            OutputCode::Success => 200,
            OutputCode::NeedsInput => 300,
            OutputCode::RetryableFailure => 400,
            OutputCode::FatalFailure => 500,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(OutputCode::Success),
            300 => Some(OutputCode::NeedsInput),
            400 => Some(OutputCode::RetryableFailure),
            500 => Some(OutputCode::FatalFailure),
            _ => None,
        }
    }
}

impl From<OutputCode> for u16 {
    fn from(code: OutputCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for OutputCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        OutputCode::from_u16(code).ok_or_else(|| format!("unknown output code {}", code))
    }
}

impl fmt::Display for OutputCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Result of one skill invocation.
///
/// `data` and `message` are always present; `message` is human-readable.
///
/// # Examples
///
/// ```
/// use skillflow_core::{OutputCode, SkillOutput};
/// use serde_json::json;
///
/// let out = SkillOutput::success("analysis done").with_data("analysis", json!({"modules": 3}));
/// assert_eq!(out.code, OutputCode::Success);
/// assert!(out.is_success());
///
/// let doc = serde_json::to_value(&out).unwrap();
/// assert_eq!(doc["code"], json!(200));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillOutput {
    pub code: OutputCode,
    #[serde(default)]
    pub data: ValueMap,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_rollback: Option<bool>,
}

impl SkillOutput {
    pub fn new(code: OutputCode, message: impl Into<String>) -> Self {
        Self {
            code,
            data: ValueMap::new(),
            message: message.into(),
            next_action: None,
            need_rollback: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(OutputCode::Success, message)
    }

    pub fn needs_input(message: impl Into<String>) -> Self {
        Self::new(OutputCode::NeedsInput, message)
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(OutputCode::RetryableFailure, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(OutputCode::FatalFailure, message)
    }

    /// Fatal output tagged with a stable machine-readable error code in `data.error`.
    pub fn fatal_with_code(error: &str, message: impl Into<String>) -> Self {
        Self::fatal(message).with_data("error", Value::String(error.to_string()))
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_data_map(mut self, data: ValueMap) -> Self {
        self.data = data;
        self
    }

    pub fn with_next_action(mut self, action: impl Into<String>) -> Self {
        self.next_action = Some(action.into());
        self
    }

    pub fn with_rollback(mut self, need_rollback: bool) -> Self {
        self.need_rollback = Some(need_rollback);
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == OutputCode::Success
    }

    /// The `data.error` tag, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_round_trip_through_numbers() {
        for code in [200u16, 300, 400, 500] {
            let parsed = OutputCode::from_u16(code).unwrap();
            assert_eq!(parsed.as_u16(), code);
        }
        assert!(OutputCode::from_u16(250).is_none());
    }

    #[test]
    fn test_unknown_code_rejected_on_deserialize() {
        let result: Result<SkillOutput, _> =
            serde_json::from_value(json!({"code": 201, "message": "odd"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_fields_skipped() {
        let doc = serde_json::to_value(SkillOutput::retryable("tests failed")).unwrap();
        assert_eq!(doc, json!({"code": 400, "data": {}, "message": "tests failed"}));
    }

    #[test]
    fn test_fatal_with_code() {
        let out = SkillOutput::fatal_with_code("SKILL_NOT_FOUND", "missing");
        assert_eq!(out.error_code(), Some("SKILL_NOT_FOUND"));
    }
}
