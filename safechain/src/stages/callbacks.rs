//! Lifecycle hooks attached to a stage.

use crate::errors::{StageError, WireError};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a lifecycle hook.
pub type CallbackFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A lifecycle hook receiving a payload of type `P`.
pub type Hook<P> = Arc<dyn Fn(P) -> CallbackFuture + Send + Sync>;

/// Payload of `on_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartPayload {
    /// The caller-supplied input.
    pub raw_input: Value,
}

/// Payload of `on_success`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessPayload {
    /// The caller-supplied input.
    pub raw_input: Value,
    /// The stage's validated input.
    pub parsed_input: Option<Value>,
    /// The parent's value.
    pub ctx: Option<Value>,
    /// Parsed inputs of every ancestor, outermost first.
    pub ctx_input: Vec<Option<Value>>,
    /// The final, output-validated value.
    pub value: Value,
}

/// The error attached to failure payloads.
///
/// Direct runs attach the rich error; action runs attach the wire error.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportedError {
    /// The in-process error.
    Rich(StageError),
    /// The serialization-safe error.
    Wire(WireError),
}

impl ReportedError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rich(e) => e.code(),
            Self::Wire(e) => e.code(),
        }
    }
}

/// Payload of `on_error`.
///
/// Context fields hold whatever had been computed when the failure happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    /// The caller-supplied input.
    pub raw_input: Value,
    /// The stage's validated input, if validation ran and passed.
    pub parsed_input: Option<Value>,
    /// The parent's value, if the parent succeeded.
    pub ctx: Option<Value>,
    /// Parsed inputs of the ancestors that succeeded, outermost first.
    pub ctx_input: Vec<Option<Value>>,
    /// The public error.
    pub error: ReportedError,
    /// Whether the run was started through an action.
    pub as_action: bool,
}

/// Success or failure payload handed to `on_complete`.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The run succeeded.
    Success(SuccessPayload),
    /// The run failed.
    Failure(ErrorPayload),
}

/// Payload of `on_complete`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletePayload {
    /// How the run ended.
    pub completion: Completion,
    /// Whether the run was started through an action.
    pub as_action: bool,
}

fn hook<P, F, Fut>(f: F) -> Hook<P>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |payload| f(payload).boxed())
}

/// The set of lifecycle hooks of a stage.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub(crate) on_start: Option<Hook<StartPayload>>,
    pub(crate) on_success: Option<Hook<SuccessPayload>>,
    pub(crate) on_error: Option<Hook<ErrorPayload>>,
    pub(crate) on_complete: Option<Hook<CompletePayload>>,
}

impl Callbacks {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs concurrently with the execution; never affects its outcome.
    #[must_use]
    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(StartPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(hook(f));
        self
    }

    /// Runs after a successful run.
    #[must_use]
    pub fn on_success<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SuccessPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_success = Some(hook(f));
        self
    }

    /// Runs after a failed run.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ErrorPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_error = Some(hook(f));
        self
    }

    /// Runs once per run, after `on_success` / `on_error`.
    #[must_use]
    pub fn on_complete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CompletePayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_complete = Some(hook(f));
        self
    }

    /// Returns true if no hook is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.on_start.is_none()
            && self.on_success.is_none()
            && self.on_error.is_none()
            && self.on_complete.is_none()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}
