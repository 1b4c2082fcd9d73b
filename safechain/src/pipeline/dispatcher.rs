//! Lifecycle callback dispatch.
//!
//! `on_start` starts before the chain and runs concurrently with it. The
//! run waits for it to settle before dispatching the remaining hooks, so a
//! signal it raises can still escalate; any other failure is logged and
//! dropped. `on_success` or `on_error` then runs, followed by
//! `on_complete`. Every hook is isolated: a failing hook never stops the
//! next one and never changes the outcome.
//! Only a control-flow signal aborts the dispatch.

use super::executor::{ExecutionFailure, ExecutionRecord};
use crate::config::ExecutorConfig;
use crate::errors::Escalation;
use crate::events::{EventKind, StageEvent};
use crate::outcome::Outcome;
use crate::stages::{
    Callbacks, CompletePayload, Completion, ErrorPayload, Hook, ReportedError, Stage,
    StartPayload, SuccessPayload,
};
use crate::utils::capture;
use serde_json::{json, Value};
use std::task::Poll;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument, Span};
use uuid::Uuid;

/// Pending result of an `on_start` hook.
pub(crate) enum StartProbe {
    /// No hook, or the hook already settled.
    Settled(Option<anyhow::Error>),
    /// The hook runs on the tokio runtime.
    Spawned(JoinHandle<Option<anyhow::Error>>),
}

impl StartProbe {
    /// Waits for the hook and returns the signal it raised, if any.
    pub(crate) async fn settle(self) -> Option<anyhow::Error> {
        match self {
            Self::Settled(signal) => signal,
            Self::Spawned(handle) => match handle.await {
                Ok(signal) => signal,
                Err(e) => {
                    warn!(error = %e, "on_start task did not complete");
                    None
                }
            },
        }
    }
}

/// Fires the callbacks of one run.
pub(crate) struct CallbackDispatcher {
    config: ExecutorConfig,
    stage: String,
    callbacks: Callbacks,
    run_id: Uuid,
    as_action: bool,
}

impl CallbackDispatcher {
    pub(crate) fn new(config: &ExecutorConfig, stage: &Stage, run_id: Uuid, as_action: bool) -> Self {
        Self {
            config: config.clone(),
            stage: stage.name().to_string(),
            callbacks: stage.descriptor().callbacks().cloned().unwrap_or_default(),
            run_id,
            as_action,
        }
    }

    /// Launches `on_start`.
    ///
    /// The hook is polled once inline, so everything up to its first
    /// suspension point runs before any stage of the chain. A hook that is
    /// still pending is spawned on the current runtime, or awaited inline
    /// outside a tokio runtime.
    pub(crate) async fn start(&self, raw_input: &Value) -> StartProbe {
        let Some(hook) = self.callbacks.on_start.clone() else {
            return StartProbe::Settled(None);
        };
        let payload = StartPayload {
            raw_input: raw_input.clone(),
        };
        let config = self.config.clone();
        let stage = self.stage.clone();
        let run_id = self.run_id;

        let task = async move {
            match capture(async { hook(payload).await }).await {
                Ok(()) => None,
                Err(error) if config.is_signal(&error) => Some(error),
                Err(error) => {
                    report_failure(&config, &stage, run_id, "on_start", &error);
                    None
                }
            }
        }
        .instrument(Span::current());

        let mut task = Box::pin(task);
        if let Poll::Ready(signal) = futures::poll!(&mut task) {
            return StartProbe::Settled(signal);
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => StartProbe::Spawned(runtime.spawn(task)),
            Err(_) => StartProbe::Settled(task.await),
        }
    }

    /// Fires `on_success` or `on_error`, then `on_complete`.
    pub(crate) async fn finish(
        &self,
        execution: &Outcome<ExecutionRecord, ExecutionFailure>,
    ) -> Result<(), Escalation> {
        if self.callbacks.is_empty() {
            return Ok(());
        }

        let completion = match execution {
            Outcome::Success(record) => {
                let payload = SuccessPayload {
                    raw_input: record.private.raw_input.clone(),
                    parsed_input: record.private.parsed_input.clone(),
                    ctx: record.private.ctx.clone(),
                    ctx_input: record.private.ctx_input.clone(),
                    value: record.value.clone(),
                };
                self.invoke("on_success", self.callbacks.on_success.as_ref(), &payload)
                    .await?;
                Completion::Success(payload)
            }
            Outcome::Failure(failure) => {
                let error = if self.as_action {
                    ReportedError::Wire(failure.error.to_wire())
                } else {
                    ReportedError::Rich(failure.error.clone())
                };
                let payload = ErrorPayload {
                    raw_input: failure.private.raw_input.clone(),
                    parsed_input: failure.private.parsed_input.clone(),
                    ctx: failure.private.ctx.clone(),
                    ctx_input: failure.private.ctx_input.clone(),
                    error,
                    as_action: self.as_action,
                };
                self.invoke("on_error", self.callbacks.on_error.as_ref(), &payload)
                    .await?;
                Completion::Failure(payload)
            }
        };

        let payload = CompletePayload {
            completion,
            as_action: self.as_action,
        };
        self.invoke("on_complete", self.callbacks.on_complete.as_ref(), &payload)
            .await
    }

    async fn invoke<P: Clone>(
        &self,
        name: &'static str,
        hook: Option<&Hook<P>>,
        payload: &P,
    ) -> Result<(), Escalation> {
        let Some(hook) = hook else {
            return Ok(());
        };
        let payload = payload.clone();
        match capture(async { hook(payload).await }).await {
            Ok(()) => {
                debug!(callback = name, "Callback completed");
                Ok(())
            }
            Err(error) if self.config.is_signal(&error) => Err(Escalation::Signal {
                stage: self.stage.clone(),
                error,
            }),
            Err(error) => {
                report_failure(&self.config, &self.stage, self.run_id, name, &error);
                Ok(())
            }
        }
    }
}

fn report_failure(
    config: &ExecutorConfig,
    stage: &str,
    run_id: Uuid,
    callback: &str,
    error: &anyhow::Error,
) {
    warn!(callback, error = %error, "Callback failed");
    config.emit(
        StageEvent::new(EventKind::CallbackFailed, stage, run_id).with_data(json!({
            "callback": callback,
            "error": error.to_string(),
        })),
    );
}
