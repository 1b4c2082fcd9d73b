//! Stage handlers and the step-sequence protocol.

use crate::errors::StageError;
use crate::outcome::{AsyncOutcome, Outcome};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a handler invocation.
///
/// `Err` is the exception channel; domain failures travel inside the `Outcome`.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<Outcome<Value, StageError>>>;

/// A handler returning its outcome directly.
pub type DirectFn = Arc<dyn Fn(HandlerArgs) -> HandlerFuture + Send + Sync>;

/// A handler producing a step sequence for the executor to drive.
pub type SequenceFn = Arc<dyn Fn(HandlerArgs) -> StepSequence + Send + Sync>;

/// Per-invocation arguments handed to a stage handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerArgs {
    /// The caller-supplied input, shared by every stage of the chain.
    pub raw_input: Value,
    /// This stage's validated input; `None` without an input validator.
    pub parsed_input: Option<Value>,
    /// The parent's successful value; `None` for a root stage.
    pub ctx: Option<Value>,
    /// Parsed inputs of every ancestor, outermost first.
    pub ctx_input: Vec<Option<Value>>,
}

/// The two shapes a handler can take.
#[derive(Clone)]
pub enum Handler {
    /// Produces an outcome (or raises) in one go.
    Direct(DirectFn),
    /// Produces a step sequence; the first failing step decides the outcome.
    Sequence(SequenceFn),
}

impl Handler {
    /// A handler returning `anyhow::Result<Outcome<..>>` asynchronously.
    pub fn direct<F, Fut>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Outcome<Value, StageError>>> + Send + 'static,
    {
        Self::Direct(Arc::new(move |args| f(args).boxed()))
    }

    /// A handler returning an [`AsyncOutcome`].
    pub fn outcome<F>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> AsyncOutcome<Value, StageError> + Send + Sync + 'static,
    {
        Self::direct(move |args| {
            let pending = f(args);
            async move { Ok(pending.await) }
        })
    }

    /// A handler written with `?`: `Err` is a domain failure.
    pub fn returning<F, Fut>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, StageError>> + Send + 'static,
    {
        Self::direct(move |args| {
            let fut = f(args);
            async move { Ok(Outcome::from(fut.await)) }
        })
    }

    /// A synchronous handler.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> Outcome<Value, StageError> + Send + Sync + 'static,
    {
        Self::direct(move |args| future::ready(Ok(f(args))))
    }

    /// A handler written as a sequence of outcome-producing steps.
    pub fn sequence<F>(f: F) -> Self
    where
        F: Fn(HandlerArgs) -> StepSequence + Send + Sync + 'static,
    {
        Self::Sequence(Arc::new(f))
    }

    /// Returns true for step-sequence handlers.
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(_) => f.write_str("Handler::Direct"),
            Self::Sequence(_) => f.write_str("Handler::Sequence"),
        }
    }
}

type Step = Box<dyn FnOnce(Value) -> HandlerFuture + Send>;

/// A lazily-driven chain of steps over a running value.
///
/// Each step receives the previous value and yields an outcome. A failure
/// ends the sequence: later steps never run and the failure becomes the
/// handler's outcome. When every step succeeds the final value is wrapped as
/// success.
pub struct StepSequence {
    seed: Value,
    steps: Vec<Step>,
}

impl StepSequence {
    /// Starts a sequence from an initial value.
    #[must_use]
    pub fn start(seed: Value) -> Self {
        Self {
            seed,
            steps: Vec::new(),
        }
    }

    /// Appends an asynchronous step that may fail or raise.
    #[must_use]
    pub fn then<F, Fut>(mut self, step: F) -> Self
    where
        F: FnOnce(Value) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Outcome<Value, StageError>>> + Send + 'static,
    {
        self.steps.push(Box::new(move |value| step(value).boxed()));
        self
    }

    /// Appends a synchronous step yielding an outcome.
    #[must_use]
    pub fn yielding<F>(self, step: F) -> Self
    where
        F: FnOnce(Value) -> Outcome<Value, StageError> + Send + 'static,
    {
        self.then(move |value| future::ready(Ok(step(value))))
    }

    /// Appends an infallible transformation of the running value.
    #[must_use]
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(Value) -> Value + Send + 'static,
    {
        self.then(move |value| future::ready(Ok(Outcome::success(f(value)))))
    }

    /// Returns the number of pending steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the steps in order until one fails or raises.
    pub async fn drive(self) -> anyhow::Result<Outcome<Value, StageError>> {
        let mut current = self.seed;
        for step in self.steps {
            match step(current).await? {
                Outcome::Success(next) => current = next,
                Outcome::Failure(error) => return Ok(Outcome::failure(error)),
            }
        }
        Ok(Outcome::success(current))
    }
}

impl fmt::Debug for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSequence")
            .field("seed", &self.seed)
            .field("steps", &self.steps.len())
            .finish()
    }
}
