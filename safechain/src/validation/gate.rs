//! The validator contract and the gate wrapping it.

use super::{FlattenedIssues, ValidationIssues};
use crate::outcome::Outcome;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// A schema validator for raw stage input or handler output.
///
/// `Ok(Ok(parsed))` accepts the value; the parsed value may differ from the
/// raw one (coercion, renamed fields) and is authoritative. `Ok(Err(issues))`
/// rejects it. `Err(_)` is reserved for validator bugs: it is not a
/// validation failure and is handled like any other raised exception.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validates a raw value.
    async fn validate(&self, raw: &Value) -> anyhow::Result<Result<Value, ValidationIssues>>;
}

/// A rejected value, in both rich and flattened form.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The structured issues, for in-process consumers.
    pub cause: ValidationIssues,
    /// The field -> messages map, always serializable.
    pub flattened: FlattenedIssues,
}

impl ParseError {
    /// Builds a parse error, deriving the flattened form.
    #[must_use]
    pub fn new(cause: ValidationIssues) -> Self {
        let flattened = cause.flatten();
        Self { cause, flattened }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Runs a validator and turns its verdict into an [`Outcome`].
///
/// Exceptions raised by the validator are returned as `Err` untouched.
pub async fn validate(
    validator: &dyn Validator,
    raw: &Value,
) -> anyhow::Result<Outcome<Value, ParseError>> {
    match validator.validate(raw).await? {
        Ok(parsed) => Ok(Outcome::success(parsed)),
        Err(issues) => {
            debug!(issue_count = issues.len(), "Validation rejected value");
            Ok(Outcome::failure(ParseError::new(issues)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Issue, IssueCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_gate_returns_parsed_value() {
        let mut validator = MockValidator::new();
        validator
            .expect_validate()
            .times(1)
            .returning(|_| Ok(Ok(json!({"fullName": "John Doe"}))));

        let outcome = validate(&validator, &json!({"name": "John"})).await.unwrap();
        assert_eq!(outcome, Outcome::success(json!({"fullName": "John Doe"})));
    }

    #[tokio::test]
    async fn test_gate_builds_parse_error() {
        let mut validator = MockValidator::new();
        validator.expect_validate().returning(|_| {
            Ok(Err(ValidationIssues::single(Issue::new(
                vec!["age".into()],
                IssueCode::InvalidType,
                "Expected number",
            ))))
        });

        let outcome = validate(&validator, &json!({"age": "x"})).await.unwrap();
        let err = outcome.error().cloned().expect("failure");
        assert_eq!(err.cause.len(), 1);
        assert_eq!(err.flattened.field("age"), Some(&["Expected number".to_string()][..]));
        assert_eq!(err.to_string(), "age: Expected number");
    }

    #[tokio::test]
    async fn test_gate_propagates_validator_exceptions() {
        let mut validator = MockValidator::new();
        validator
            .expect_validate()
            .returning(|_| Err(anyhow::anyhow!("schema misconfigured")));

        let result = validate(&validator, &json!(null)).await;
        assert_eq!(result.unwrap_err().to_string(), "schema misconfigured");
    }
}
