//! Recording handlers, validators and callbacks.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::StageError;
use crate::outcome::Outcome;
use crate::stages::{
    Callbacks, CompletePayload, ErrorPayload, Handler, HandlerArgs, StartPayload, SuccessPayload,
};
use crate::validation::{ValidationIssues, Validator};

#[derive(Debug, Clone)]
enum Reply {
    Outcome(Outcome<Value, StageError>),
    Raise(String),
    Echo,
}

/// A handler that records its arguments and replies with a fixed result.
#[derive(Debug, Clone)]
pub struct MockHandler {
    reply: Arc<Mutex<Reply>>,
    calls: Arc<Mutex<Vec<HandlerArgs>>>,
}

impl MockHandler {
    /// Creates a handler that succeeds with its parsed input, or its raw
    /// input when no input validator ran.
    #[must_use]
    pub fn echo() -> Self {
        Self::with_reply(Reply::Echo)
    }

    /// Creates a handler returning `outcome`.
    #[must_use]
    pub fn returning(outcome: Outcome<Value, StageError>) -> Self {
        Self::with_reply(Reply::Outcome(outcome))
    }

    /// Creates a handler raising an exception with `message`.
    #[must_use]
    pub fn raising(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Raise(message.into()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply: Arc::new(Mutex::new(reply)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replaces the reply.
    pub fn set_outcome(&self, outcome: Outcome<Value, StageError>) {
        *self.reply.lock() = Reply::Outcome(outcome);
    }

    /// Returns a [`Handler`] backed by this mock.
    #[must_use]
    pub fn handler(&self) -> Handler {
        let mock = self.clone();
        Handler::direct(move |args: HandlerArgs| {
            let mock = mock.clone();
            async move {
                mock.calls.lock().push(args.clone());
                let reply = mock.reply.lock().clone();
                match reply {
                    Reply::Outcome(outcome) => Ok(outcome),
                    Reply::Raise(message) => Err(anyhow::anyhow!(message)),
                    Reply::Echo => Ok(Outcome::success(
                        args.parsed_input.unwrap_or(args.raw_input),
                    )),
                }
            }
        })
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the arguments of every invocation.
    #[must_use]
    pub fn recorded_args(&self) -> Vec<HandlerArgs> {
        self.calls.lock().clone()
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

/// A validator with a fixed verdict that counts its invocations.
///
/// Clones share the counter.
#[derive(Debug, Clone)]
pub struct CountingValidator {
    verdict: Option<ValidationIssues>,
    calls: Arc<Mutex<usize>>,
}

impl CountingValidator {
    /// Accepts every value unchanged.
    #[must_use]
    pub fn accepting() -> Self {
        Self {
            verdict: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Rejects every value with `issues`.
    #[must_use]
    pub fn rejecting(issues: ValidationIssues) -> Self {
        Self {
            verdict: Some(issues),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns the number of invocations.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Validator for CountingValidator {
    async fn validate(&self, raw: &Value) -> anyhow::Result<Result<Value, ValidationIssues>> {
        *self.calls.lock() += 1;
        Ok(match &self.verdict {
            None => Ok(raw.clone()),
            Some(issues) => Err(issues.clone()),
        })
    }
}

/// One recorded callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCallback {
    /// `on_start` ran.
    Start(StartPayload),
    /// `on_success` ran.
    Success(SuccessPayload),
    /// `on_error` ran.
    Error(ErrorPayload),
    /// `on_complete` ran.
    Complete(CompletePayload),
}

impl RecordedCallback {
    /// Returns the hook name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "on_start",
            Self::Success(_) => "on_success",
            Self::Error(_) => "on_error",
            Self::Complete(_) => "on_complete",
        }
    }
}

/// Builds [`Callbacks`] that record every invocation.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallbacks {
    calls: Arc<Mutex<Vec<RecordedCallback>>>,
}

impl RecordingCallbacks {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns callbacks that record into this recorder.
    #[must_use]
    pub fn callbacks(&self) -> Callbacks {
        let (start, success, error, complete) =
            (self.clone(), self.clone(), self.clone(), self.clone());
        Callbacks::new()
            .on_start(move |p| start.record(RecordedCallback::Start(p)))
            .on_success(move |p| success.record(RecordedCallback::Success(p)))
            .on_error(move |p| error.record(RecordedCallback::Error(p)))
            .on_complete(move |p| complete.record(RecordedCallback::Complete(p)))
    }

    fn record(&self, call: RecordedCallback) -> futures::future::Ready<anyhow::Result<()>> {
        self.calls.lock().push(call);
        futures::future::ready(Ok(()))
    }

    /// Returns every recorded invocation, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCallback> {
        self.calls.lock().clone()
    }

    /// Returns the hook names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(RecordedCallback::name).collect()
    }

    /// Returns the first `on_error` payload.
    #[must_use]
    pub fn error_payload(&self) -> Option<ErrorPayload> {
        self.calls.lock().iter().find_map(|call| match call {
            RecordedCallback::Error(payload) => Some(payload.clone()),
            _ => None,
        })
    }

    /// Returns the first `on_success` payload.
    #[must_use]
    pub fn success_payload(&self) -> Option<SuccessPayload> {
        self.calls.lock().iter().find_map(|call| match call {
            RecordedCallback::Success(payload) => Some(payload.clone()),
            _ => None,
        })
    }
}
