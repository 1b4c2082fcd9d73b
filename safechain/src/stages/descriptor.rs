//! Immutable stage descriptors and the shared `Stage` handle.

use super::{Callbacks, Handler};
use crate::errors::{Escalation, StageError};
use crate::outcome::Outcome;
use crate::pipeline::{Action, Executor};
use crate::validation::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Maps the public error of a stage's own failures.
pub type ErrorMapper = Arc<dyn Fn(StageError) -> StageError + Send + Sync>;

/// Converts an exception raised while running a stage into an outcome.
#[derive(Clone, Default)]
pub enum CatchHandler {
    /// Wraps the exception as `UNCAUGHT_ERROR`.
    ///
    /// Ancestors using the default escalate instead of converting.
    #[default]
    Default,
    /// A user-supplied converter. It must return a failure.
    Custom(Arc<dyn Fn(anyhow::Error) -> Outcome<Value, StageError> + Send + Sync>),
}

impl CatchHandler {
    /// Creates a custom catch handler.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(anyhow::Error) -> Outcome<Value, StageError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Returns true if this is the default handler.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Debug for CatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("CatchHandler::Default"),
            Self::Custom(_) => f.write_str("CatchHandler::Custom"),
        }
    }
}

/// Describes one link of a stage chain.
///
/// Descriptors are assembled once and frozen by [`StageDescriptor::build`].
/// The parent is fixed at construction, so a chain can never contain a cycle.
#[derive(Clone)]
pub struct StageDescriptor {
    pub(crate) name: String,
    pub(crate) parent: Option<Stage>,
    pub(crate) input_validator: Option<Arc<dyn Validator>>,
    pub(crate) output_validator: Option<Arc<dyn Validator>>,
    pub(crate) handler: Handler,
    pub(crate) catch: CatchHandler,
    pub(crate) error_mapper: Option<ErrorMapper>,
    pub(crate) callbacks: Option<Callbacks>,
}

impl StageDescriptor {
    /// Creates a root descriptor with the given handler.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            parent: None,
            input_validator: None,
            output_validator: None,
            handler,
            catch: CatchHandler::Default,
            error_mapper: None,
            callbacks: None,
        }
    }

    /// Sets the parent stage.
    #[must_use]
    pub fn with_parent(mut self, parent: &Stage) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Sets the input validator.
    #[must_use]
    pub fn with_input(mut self, validator: impl Validator + 'static) -> Self {
        self.input_validator = Some(Arc::new(validator));
        self
    }

    /// Sets an already shared input validator.
    #[must_use]
    pub fn with_shared_input(mut self, validator: Arc<dyn Validator>) -> Self {
        self.input_validator = Some(validator);
        self
    }

    /// Sets the output validator.
    #[must_use]
    pub fn with_output(mut self, validator: impl Validator + 'static) -> Self {
        self.output_validator = Some(Arc::new(validator));
        self
    }

    /// Sets an already shared output validator.
    #[must_use]
    pub fn with_shared_output(mut self, validator: Arc<dyn Validator>) -> Self {
        self.output_validator = Some(validator);
        self
    }

    /// Replaces the default catch handler.
    #[must_use]
    pub fn with_catch<F>(mut self, f: F) -> Self
    where
        F: Fn(anyhow::Error) -> Outcome<Value, StageError> + Send + Sync + 'static,
    {
        self.catch = CatchHandler::custom(f);
        self
    }

    /// Sets the error mapper applied to this stage's own failures.
    #[must_use]
    pub fn with_error_mapper<F>(mut self, f: F) -> Self
    where
        F: Fn(StageError) -> StageError + Send + Sync + 'static,
    {
        self.error_mapper = Some(Arc::new(f));
        self
    }

    /// Sets the lifecycle callbacks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    /// Freezes the descriptor.
    #[must_use]
    pub fn build(self) -> Stage {
        Stage(Arc::new(self))
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent stage.
    #[must_use]
    pub const fn parent(&self) -> Option<&Stage> {
        self.parent.as_ref()
    }

    /// Returns the handler.
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns the catch handler.
    #[must_use]
    pub const fn catch(&self) -> &CatchHandler {
        &self.catch
    }

    /// Returns the callbacks, if any.
    #[must_use]
    pub const fn callbacks(&self) -> Option<&Callbacks> {
        self.callbacks.as_ref()
    }

    /// Returns true if an input validator is set.
    #[must_use]
    pub const fn has_input_validator(&self) -> bool {
        self.input_validator.is_some()
    }

    /// Returns true if an output validator is set.
    #[must_use]
    pub const fn has_output_validator(&self) -> bool {
        self.output_validator.is_some()
    }
}

impl fmt::Debug for StageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(Stage::name))
            .field("input_validator", &self.input_validator.is_some())
            .field("output_validator", &self.output_validator.is_some())
            .field("handler", &self.handler)
            .field("catch", &self.catch)
            .field("error_mapper", &self.error_mapper.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// A frozen, cheaply clonable stage.
///
/// Many callers may run the same stage concurrently; every run allocates its
/// own context.
#[derive(Clone, Debug)]
pub struct Stage(Arc<StageDescriptor>);

impl Stage {
    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &StageDescriptor {
        &self.0
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the number of stages in the chain ending at this stage.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.0.parent.as_ref();
        while let Some(stage) = current {
            depth += 1;
            current = stage.0.parent.as_ref();
        }
        depth
    }

    /// Starts a child descriptor whose parent is this stage.
    #[must_use]
    pub fn child(&self, name: impl Into<String>, handler: Handler) -> StageDescriptor {
        StageDescriptor::new(name, handler).with_parent(self)
    }

    /// Runs the chain with the default executor.
    pub async fn run(&self, input: Value) -> Result<Outcome<Value, StageError>, Escalation> {
        Executor::default().run(self, input).await
    }

    /// Creates a wire-safe entry point backed by the default executor.
    #[must_use]
    pub fn create_action(&self) -> Action {
        Executor::default().create_action(self)
    }
}
