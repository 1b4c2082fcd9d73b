//! Error types for the safechain framework.
//!
//! Two families live here:
//! - `StageError`, the public error carried by a failed `Outcome`, with its
//!   serialization-safe projection `WireError`
//! - `Escalation`, raised when an exception must bypass the outcome model
//!   entirely (control-flow signals, unhandled ancestor exceptions, contract
//!   violations)

use crate::validation::{FlattenedIssues, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Codes for the failures the framework itself produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// An input validator rejected the raw input.
    InputParsing,
    /// An output validator rejected the handler's value.
    OutputParsing,
    /// An exception was converted by the default catch handler.
    UncaughtError,
}

impl ErrorCode {
    /// Returns the wire spelling of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InputParsing => "INPUT_PARSING",
            Self::OutputParsing => "OUTPUT_PARSING",
            Self::UncaughtError => "UNCAUGHT_ERROR",
        }
    }

    /// Parses a wire spelling back into a code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "INPUT_PARSING" => Some(Self::InputParsing),
            "OUTPUT_PARSING" => Some(Self::OutputParsing),
            "UNCAUGHT_ERROR" => Some(Self::UncaughtError),
            _ => None,
        }
    }

    /// Whether `code` is reserved for framework failures.
    ///
    /// Domain payloads should not use these codes: on the wire they are
    /// indistinguishable from the framework failure of the same shape.
    #[must_use]
    pub fn is_reserved(code: &str) -> bool {
        Self::from_code(code).is_some()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The public error of a failed stage execution.
///
/// This is the rich, in-process shape: parse errors keep their structured
/// cause and uncaught errors keep the original exception.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// An input validator rejected the raw input.
    #[error("input parsing failed: {0}")]
    InputParsing(ParseError),

    /// An output validator rejected the handler's value.
    #[error("output parsing failed: {0}")]
    OutputParsing(ParseError),

    /// An exception converted by the default catch handler.
    #[error("{0}")]
    Uncaught(UncaughtError),

    /// A user-defined domain error returned by a handler or catch handler.
    #[error("domain error: {0}")]
    Domain(serde_json::Value),
}

impl StageError {
    /// Creates a domain error from any JSON payload.
    ///
    /// The payload's `code` should not be one of the reserved framework
    /// codes (see [`ErrorCode::is_reserved`]). Such a payload still
    /// serializes, but it reads back as [`WireError::Framework`] whenever it
    /// also matches the framework shape.
    pub fn domain(payload: impl Into<serde_json::Value>) -> Self {
        Self::Domain(payload.into())
    }

    /// Returns the framework error code, if this is a framework failure.
    #[must_use]
    pub const fn framework_code(&self) -> Option<ErrorCode> {
        match self {
            Self::InputParsing(_) => Some(ErrorCode::InputParsing),
            Self::OutputParsing(_) => Some(ErrorCode::OutputParsing),
            Self::Uncaught(_) => Some(ErrorCode::UncaughtError),
            Self::Domain(_) => None,
        }
    }

    /// Returns the error code.
    ///
    /// Domain errors report the `code` string field of their payload, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Domain(payload) => payload.get("code").and_then(serde_json::Value::as_str),
            other => other.framework_code().map(|code| code.as_str()),
        }
    }

    /// Returns the parse error for input/output parsing failures.
    #[must_use]
    pub const fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::InputParsing(e) | Self::OutputParsing(e) => Some(e),
            _ => None,
        }
    }

    /// Projects the error into its serialization-safe shape.
    #[must_use]
    pub fn to_wire(&self) -> WireError {
        match self {
            Self::InputParsing(e) => WireError::Framework(FrameworkWireError::InputParsing {
                cause: e.flattened.clone(),
            }),
            Self::OutputParsing(e) => WireError::Framework(FrameworkWireError::OutputParsing {
                cause: e.flattened.clone(),
            }),
            Self::Uncaught(e) => WireError::Framework(FrameworkWireError::UncaughtError {
                cause: e.message.clone(),
            }),
            Self::Domain(payload) => WireError::Domain(payload.clone()),
        }
    }
}

/// An exception captured by the default catch handler.
#[derive(Debug, Clone, Error)]
#[error("{message} ({cause})")]
pub struct UncaughtError {
    /// Message exposed on the wire in place of the exception.
    pub message: String,
    /// The original exception.
    pub cause: Arc<anyhow::Error>,
}

impl UncaughtError {
    /// Wraps an exception.
    pub fn new(message: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            message: message.into(),
            cause: Arc::new(cause),
        }
    }

    /// Returns the original exception.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
}

impl PartialEq for UncaughtError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.cause.to_string() == other.cause.to_string()
    }
}

/// Serialization-safe projection of [`StageError`].
///
/// Deserialization tries the framework shapes first, keyed by the reserved
/// codes `INPUT_PARSING`, `OUTPUT_PARSING` and `UNCAUGHT_ERROR`. Any payload
/// that does not match one of them is a domain error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireError {
    /// A framework failure tagged by its code.
    Framework(FrameworkWireError),
    /// A domain error payload, passed through as-is.
    Domain(serde_json::Value),
}

impl WireError {
    /// Returns the error code, reading the `code` field of domain payloads.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Framework(e) => Some(e.code().as_str()),
            Self::Domain(payload) => payload.get("code").and_then(serde_json::Value::as_str),
        }
    }
}

/// Wire shape of framework failures: `{ "code": .., "cause": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum FrameworkWireError {
    /// Input validation failed; the cause is the flattened issue map.
    #[serde(rename = "INPUT_PARSING")]
    InputParsing {
        /// Flattened validation issues.
        cause: FlattenedIssues,
    },
    /// Output validation failed; the cause is the flattened issue map.
    #[serde(rename = "OUTPUT_PARSING")]
    OutputParsing {
        /// Flattened validation issues.
        cause: FlattenedIssues,
    },
    /// An exception was converted by the default catch handler.
    #[serde(rename = "UNCAUGHT_ERROR")]
    UncaughtError {
        /// Generic, non-sensitive description.
        cause: String,
    },
}

impl FrameworkWireError {
    /// Returns the code of this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InputParsing { .. } => ErrorCode::InputParsing,
            Self::OutputParsing { .. } => ErrorCode::OutputParsing,
            Self::UncaughtError { .. } => ErrorCode::UncaughtError,
        }
    }
}

/// A panic captured while running user code.
#[derive(Debug, Clone, Error)]
#[error("panicked: {message}")]
pub struct PanicError {
    /// The panic message, when it was a string.
    pub message: String,
}

/// An exception that escaped an execution instead of becoming an `Outcome`.
#[derive(Debug, Error)]
pub enum Escalation {
    /// A control-flow signal that must reach the host unmodified.
    #[error("control-flow signal raised in stage '{stage}': {error}")]
    Signal {
        /// Stage whose handler, validator or callback raised the signal.
        stage: String,
        /// The original signal.
        error: anyhow::Error,
    },

    /// An exception in an ancestor stage with no catch handler configured.
    #[error("unhandled exception in ancestor stage '{stage}': {error}")]
    Unhandled {
        /// The ancestor stage.
        stage: String,
        /// The original exception.
        error: anyhow::Error,
    },

    /// A catch handler returned success instead of failure.
    #[error("catch handler of stage '{stage}' returned a success outcome")]
    CatchContract {
        /// The offending stage.
        stage: String,
    },

    /// The ancestor chain is deeper than the configured limit.
    #[error("stage '{stage}' exceeds the maximum chain depth of {limit}")]
    DepthExceeded {
        /// The stage at which the limit was reached.
        stage: String,
        /// The configured limit.
        limit: usize,
    },
}

impl Escalation {
    /// Returns true for control-flow signals.
    #[must_use]
    pub const fn is_signal(&self) -> bool {
        matches!(self, Self::Signal { .. })
    }

    /// Returns the stage the escalation originated from.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Signal { stage, .. }
            | Self::Unhandled { stage, .. }
            | Self::CatchContract { stage }
            | Self::DepthExceeded { stage, .. } => stage,
        }
    }

    /// Returns the original exception, if the escalation carries one.
    pub fn into_source(self) -> Option<anyhow::Error> {
        match self {
            Self::Signal { error, .. } | Self::Unhandled { error, .. } => Some(error),
            Self::CatchContract { .. } | Self::DepthExceeded { .. } => None,
        }
    }
}

/// Errors raised while loading executor settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings document could not be parsed.
    #[error("invalid executor settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting holds an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}
