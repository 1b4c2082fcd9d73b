//! The chain executor.
//!
//! One run walks the ancestor chain depth-first: parent, own input
//! validation, handler, own output validation, error mapping. The first
//! failure short-circuits every later step of the stage and of all its
//! descendants. Exceptions are recovered into outcomes unless they are
//! control-flow signals or come from an ancestor that never asked to catch
//! them; those leave the run as an [`Escalation`].

use super::dispatcher::CallbackDispatcher;
use super::Action;
use crate::config::ExecutorConfig;
use crate::errors::{Escalation, StageError, UncaughtError};
use crate::events::{EventKind, StageEvent};
use crate::outcome::Outcome;
use crate::stages::{CatchHandler, Handler, HandlerArgs, Stage, StageDescriptor};
use crate::utils::{capture, capture_sync};
use crate::validation::validate;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Whatever context a stage had computed, kept for callback inspection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrivateContext {
    /// The caller-supplied input.
    pub raw_input: Value,
    /// The stage's validated input, once validation passed.
    pub parsed_input: Option<Value>,
    /// The parent's value, once the parent succeeded.
    pub ctx: Option<Value>,
    /// Parsed inputs of the ancestors that succeeded, outermost first.
    pub ctx_input: Vec<Option<Value>>,
}

/// A successful stage execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// The final, output-validated value.
    pub value: Value,
    /// The context the value was computed in.
    pub private: PrivateContext,
}

/// Where a failure came from, relative to the stage that reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureOrigin {
    /// An ancestor failed; this stage never ran.
    Ancestor,
    /// The stage's input validator rejected the raw input.
    InputParsing,
    /// The handler returned a failure.
    Handler,
    /// An exception was converted by the catch handler.
    Caught,
    /// The stage's output validator rejected the handler's value.
    OutputParsing,
}

impl FailureOrigin {
    /// Returns true for failures produced by the stage's own handler or
    /// catch path. Only these go through the error mapper.
    #[must_use]
    pub const fn is_own(&self) -> bool {
        matches!(self, Self::Handler | Self::Caught)
    }
}

/// A failed stage execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionFailure {
    /// The public error.
    pub error: StageError,
    /// Where the error came from.
    pub origin: FailureOrigin,
    /// The context known when the failure happened.
    pub private: PrivateContext,
}

/// Result of [`Executor::execute`].
pub type Execution = Result<Outcome<ExecutionRecord, ExecutionFailure>, Escalation>;

/// Runs stage chains.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor with the given configuration.
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs the chain ending at `stage` and returns the rich outcome.
    ///
    /// Callbacks of `stage` fire around the run. An `Err` means the run was
    /// escalated and produced no outcome.
    pub async fn run(
        &self,
        stage: &Stage,
        input: Value,
    ) -> Result<Outcome<Value, StageError>, Escalation> {
        self.run_mode(stage, input, false).await
    }

    /// Creates a wire-safe entry point for `stage`.
    #[must_use]
    pub fn create_action(&self, stage: &Stage) -> Action {
        Action::new(self.clone(), stage.clone())
    }

    pub(crate) async fn run_mode(
        &self,
        stage: &Stage,
        input: Value,
        as_action: bool,
    ) -> Result<Outcome<Value, StageError>, Escalation> {
        let run_id = Uuid::new_v4();
        let span = info_span!("stage.run", stage = %stage.name(), %run_id, as_action);

        async move {
            let started = Instant::now();
            self.config.emit(
                StageEvent::new(EventKind::StageStarted, stage.name(), run_id)
                    .with_data(json!({ "as_action": as_action, "depth": stage.depth() })),
            );

            let dispatcher = CallbackDispatcher::new(&self.config, stage, run_id, as_action);
            let probe = dispatcher.start(&input).await;

            let execution = self.execute(stage, &input, true).await;
            let signal = probe.settle().await;

            let execution = match (execution, signal) {
                (Err(escalation), _) => return Err(self.escalate(stage, run_id, escalation)),
                (Ok(_), Some(error)) => {
                    let escalation = Escalation::Signal {
                        stage: stage.name().to_string(),
                        error,
                    };
                    return Err(self.escalate(stage, run_id, escalation));
                }
                (Ok(execution), None) => execution,
            };

            if let Err(escalation) = dispatcher.finish(&execution).await {
                return Err(self.escalate(stage, run_id, escalation));
            }

            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            let outcome = match execution {
                Outcome::Success(record) => {
                    debug!(duration_ms, "Stage run succeeded");
                    self.config.emit(
                        StageEvent::new(EventKind::StageSucceeded, stage.name(), run_id)
                            .with_data(json!({ "duration_ms": duration_ms })),
                    );
                    Outcome::success(record.value)
                }
                Outcome::Failure(failure) => {
                    debug!(duration_ms, code = ?failure.error.code(), "Stage run failed");
                    self.config.emit(
                        StageEvent::new(EventKind::StageFailed, stage.name(), run_id).with_data(
                            json!({
                                "duration_ms": duration_ms,
                                "code": failure.error.code(),
                                "origin": format!("{:?}", failure.origin),
                            }),
                        ),
                    );
                    Outcome::failure(failure.error)
                }
            };
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Executes the chain ending at `stage` without firing callbacks.
    ///
    /// `is_leaf` marks the invoked stage. Ancestors are always executed as
    /// non-leaf, so an exception in an ancestor with the default catch
    /// handler escalates instead of becoming `UNCAUGHT_ERROR`.
    pub fn execute<'a>(
        &'a self,
        stage: &'a Stage,
        raw: &'a Value,
        is_leaf: bool,
    ) -> BoxFuture<'a, Execution> {
        self.execute_at(stage.descriptor(), raw, is_leaf, 1)
    }

    fn execute_at<'a>(
        &'a self,
        stage: &'a StageDescriptor,
        raw: &'a Value,
        is_leaf: bool,
        depth: usize,
    ) -> BoxFuture<'a, Execution> {
        async move {
            let limit = self.config.settings.max_chain_depth;
            if depth > limit {
                return Err(Escalation::DepthExceeded {
                    stage: stage.name.clone(),
                    limit,
                });
            }

            let mut private = PrivateContext {
                raw_input: raw.clone(),
                ..PrivateContext::default()
            };

            if let Some(parent) = &stage.parent {
                match self.execute_at(parent.descriptor(), raw, false, depth + 1).await? {
                    Outcome::Success(record) => {
                        let mut ctx_input = record.private.ctx_input;
                        ctx_input.push(record.private.parsed_input);
                        private.ctx = Some(record.value);
                        private.ctx_input = ctx_input;
                    }
                    Outcome::Failure(failure) => {
                        debug!(stage = %stage.name, parent = %parent.name(), "Ancestor failed");
                        private.ctx_input = failure.private.ctx_input;
                        return Ok(Outcome::failure(ExecutionFailure {
                            error: failure.error,
                            origin: FailureOrigin::Ancestor,
                            private,
                        }));
                    }
                }
            }

            if let Some(validator) = &stage.input_validator {
                match capture(validate(validator.as_ref(), raw)).await {
                    Ok(Outcome::Success(parsed)) => private.parsed_input = Some(parsed),
                    Ok(Outcome::Failure(error)) => {
                        return self.fail(
                            stage,
                            StageError::InputParsing(error),
                            FailureOrigin::InputParsing,
                            private,
                        );
                    }
                    Err(exception) => {
                        let error = self.recover(stage, is_leaf, exception)?;
                        return self.fail(stage, error, FailureOrigin::Caught, private);
                    }
                }
            }

            let args = HandlerArgs {
                raw_input: raw.clone(),
                parsed_input: private.parsed_input.clone(),
                ctx: private.ctx.clone(),
                ctx_input: private.ctx_input.clone(),
            };
            let handled = match &stage.handler {
                Handler::Direct(f) => capture(async { f(args).await }).await,
                Handler::Sequence(f) => capture(async { f(args).drive().await }).await,
            };

            let value = match handled {
                Ok(Outcome::Success(value)) => value,
                Ok(Outcome::Failure(error)) => {
                    return self.fail(stage, error, FailureOrigin::Handler, private);
                }
                Err(exception) => {
                    let error = self.recover(stage, is_leaf, exception)?;
                    return self.fail(stage, error, FailureOrigin::Caught, private);
                }
            };

            let value = match &stage.output_validator {
                None => value,
                Some(validator) => match capture(validate(validator.as_ref(), &value)).await {
                    Ok(Outcome::Success(parsed)) => parsed,
                    Ok(Outcome::Failure(error)) => {
                        return self.fail(
                            stage,
                            StageError::OutputParsing(error),
                            FailureOrigin::OutputParsing,
                            private,
                        );
                    }
                    Err(exception) => {
                        let error = self.recover(stage, is_leaf, exception)?;
                        return self.fail(stage, error, FailureOrigin::Caught, private);
                    }
                },
            };

            Ok(Outcome::success(ExecutionRecord { value, private }))
        }
        .boxed()
    }

    /// Turns an exception raised by this stage into its public error, or
    /// escalates it.
    fn recover(
        &self,
        stage: &StageDescriptor,
        is_leaf: bool,
        exception: anyhow::Error,
    ) -> Result<StageError, Escalation> {
        if self.config.is_signal(&exception) {
            return Err(Escalation::Signal {
                stage: stage.name.clone(),
                error: exception,
            });
        }

        match &stage.catch {
            CatchHandler::Default if !is_leaf => {
                warn!(stage = %stage.name, error = %exception, "Unhandled exception in ancestor");
                Err(Escalation::Unhandled {
                    stage: stage.name.clone(),
                    error: exception,
                })
            }
            CatchHandler::Default => {
                debug!(stage = %stage.name, error = %exception, "Converting uncaught exception");
                Ok(StageError::Uncaught(UncaughtError::new(
                    self.config.settings.uncaught_message.clone(),
                    exception,
                )))
            }
            CatchHandler::Custom(catch) => match capture_sync(|| catch(exception)) {
                Ok(Outcome::Failure(error)) => Ok(error),
                Ok(Outcome::Success(_)) => Err(Escalation::CatchContract {
                    stage: stage.name.clone(),
                }),
                Err(panic) => Err(Escalation::Unhandled {
                    stage: stage.name.clone(),
                    error: panic,
                }),
            },
        }
    }

    fn fail(
        &self,
        stage: &StageDescriptor,
        error: StageError,
        origin: FailureOrigin,
        private: PrivateContext,
    ) -> Execution {
        let error = match &stage.error_mapper {
            Some(mapper) if origin.is_own() => {
                capture_sync(|| mapper(error)).map_err(|panic| Escalation::Unhandled {
                    stage: stage.name.clone(),
                    error: panic,
                })?
            }
            _ => error,
        };
        debug!(stage = %stage.name, ?origin, code = ?error.code(), "Stage failed");
        Ok(Outcome::failure(ExecutionFailure {
            error,
            origin,
            private,
        }))
    }

    fn escalate(&self, stage: &Stage, run_id: Uuid, escalation: Escalation) -> Escalation {
        if escalation.is_signal() {
            debug!(origin = %escalation.stage(), "Control-flow signal escalated");
            self.config.emit(
                StageEvent::new(EventKind::SignalEscalated, stage.name(), run_id)
                    .with_data(json!({ "origin": escalation.stage() })),
            );
        } else {
            warn!(error = %escalation, "Stage run escalated");
            self.config.emit(
                StageEvent::new(EventKind::StageFailed, stage.name(), run_id).with_data(json!({
                    "escalation": escalation.to_string(),
                    "origin": escalation.stage(),
                })),
            );
        }
        escalation
    }
}

