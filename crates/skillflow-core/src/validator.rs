//! Checks values against the skill input/output contract.

use crate::error::ContractError;
use crate::input::SkillInput;
use crate::output::{OutputCode, SkillOutput};
use crate::value::Value;

/// Checks that an input carries the identifiers every invocation needs.
pub fn validate_input(input: &SkillInput) -> Result<(), ContractError> {
    if input.trace_id.trim().is_empty() {
        return Err(ContractError::EmptyTraceId);
    }
    if input.task.name.trim().is_empty() {
        return Err(ContractError::EmptyTaskName);
    }
    Ok(())
}

/// Checks a typed output.
///
/// The code and data shape are enforced by the type; the message must be
/// non-blank and data keys non-empty.
pub fn validate_output(output: &SkillOutput) -> Result<(), ContractError> {
    if output.message.trim().is_empty() {
        return Err(ContractError::EmptyMessage);
    }
    if output.data.keys().any(|k| k.is_empty()) {
        return Err(ContractError::InvalidField {
            field: "data",
            reason: "keys must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Parses and validates an output document produced outside the type system.
///
/// # Examples
///
/// ```
/// use skillflow_core::validator::parse_output;
/// use skillflow_core::OutputCode;
/// use serde_json::json;
///
/// let out = parse_output(&json!({"code": 300, "data": {}, "message": "need a target"})).unwrap();
/// assert_eq!(out.code, OutputCode::NeedsInput);
///
/// assert!(parse_output(&json!({"code": 201, "data": {}, "message": "x"})).is_err());
/// ```
pub fn parse_output(doc: &Value) -> Result<SkillOutput, ContractError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| ContractError::Malformed("output must be an object".to_string()))?;

    let code = obj
        .get("code")
        .and_then(Value::as_i64)
        .ok_or(ContractError::InvalidField {
            field: "code",
            reason: "missing or not an integer".to_string(),
        })?;
    let code = u16::try_from(code)
        .ok()
        .and_then(OutputCode::from_u16)
        .ok_or(ContractError::UnknownCode(code))?;

    let data = match obj.get("data") {
        Some(Value::Object(map)) => map.clone(),
        _ => {
            return Err(ContractError::InvalidField {
                field: "data",
                reason: "missing or not an object".to_string(),
            })
        }
    };

    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .ok_or(ContractError::InvalidField {
            field: "message",
            reason: "missing or not a string".to_string(),
        })?;

    let mut output = SkillOutput::new(code, message).with_data_map(data);
    output.next_action = obj
        .get("nextAction")
        .and_then(Value::as_str)
        .map(str::to_string);
    output.need_rollback = obj.get("needRollback").and_then(Value::as_bool);

    validate_output(&output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_input() {
        assert!(validate_input(&SkillInput::new("t", "task")).is_ok());
        assert_eq!(
            validate_input(&SkillInput::new(" ", "task")),
            Err(ContractError::EmptyTraceId)
        );
        assert_eq!(
            validate_input(&SkillInput::new("t", "")),
            Err(ContractError::EmptyTaskName)
        );
    }

    #[test]
    fn test_validate_output_rejects_blank_message() {
        assert_eq!(
            validate_output(&SkillOutput::success("  ")),
            Err(ContractError::EmptyMessage)
        );
        assert!(validate_output(&SkillOutput::success("ok")).is_ok());
    }

    #[test]
    fn test_parse_output_field_errors() {
        let err = parse_output(&json!({"code": 200, "message": "ok"})).unwrap_err();
        assert!(matches!(err, ContractError::InvalidField { field: "data", .. }));

        let err = parse_output(&json!({"code": 200, "data": {}})).unwrap_err();
        assert!(matches!(err, ContractError::InvalidField { field: "message", .. }));

        let err = parse_output(&json!({"code": 404, "data": {}, "message": "x"})).unwrap_err();
        assert_eq!(err, ContractError::UnknownCode(404));

        assert!(matches!(
            parse_output(&json!("nope")),
            Err(ContractError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_output_optional_fields() {
        let out = parse_output(&json!({
            "code": 400,
            "data": {"failures": 2},
            "message": "2 tests failed",
            "nextAction": "fix",
            "needRollback": true
        }))
        .unwrap();

        assert_eq!(out.next_action.as_deref(), Some("fix"));
        assert_eq!(out.need_rollback, Some(true));
        assert_eq!(out.data.get("failures"), Some(&json!(2)));
    }
}
