//! Test assertions for outcomes.

use crate::errors::{StageError, WireError};
use crate::outcome::{Outcome, WireOutcome};
use serde_json::Value;

/// Asserts success and returns the value.
#[track_caller]
pub fn assert_success(outcome: &Outcome<Value, StageError>) -> &Value {
    match outcome {
        Outcome::Success(value) => value,
        Outcome::Failure(error) => panic!("Expected success, got failure: {error:?}"),
    }
}

/// Asserts failure and returns the error.
#[track_caller]
pub fn assert_failure(outcome: &Outcome<Value, StageError>) -> &StageError {
    match outcome {
        Outcome::Failure(error) => error,
        Outcome::Success(value) => panic!("Expected failure, got success: {value}"),
    }
}

/// Asserts failure with the given error code.
#[track_caller]
pub fn assert_failure_code(outcome: &Outcome<Value, StageError>, code: &str) {
    let error = assert_failure(outcome);
    assert_eq!(
        error.code(),
        Some(code),
        "Expected error code {code}, got {:?}",
        error
    );
}

/// Asserts that a parsing failure reports every listed field.
#[track_caller]
pub fn assert_field_errors(error: &StageError, fields: &[&str]) {
    let Some(parse) = error.parse_error() else {
        panic!("Expected a parsing error, got {error:?}");
    };
    for field in fields {
        assert!(
            parse.flattened.field(field).is_some(),
            "Expected field error for '{}', got {:?}",
            field,
            parse.flattened
        );
    }
}

/// Asserts a wire failure with the given code.
#[track_caller]
pub fn assert_wire_failure_code(outcome: &WireOutcome<Value, WireError>, code: &str) {
    match outcome {
        WireOutcome::Err(error) => assert_eq!(
            error.code(),
            Some(code),
            "Expected wire error code {code}, got {:?}",
            error
        ),
        WireOutcome::Ok(value) => panic!("Expected wire failure, got value: {value}"),
    }
}
