//! Lifecycle events emitted while stages run.
//!
//! Every run reports `stage.started` and then exactly one of
//! `stage.succeeded` / `stage.failed`, or `signal.escalated` when a
//! control-flow signal leaves the run. Failing callbacks add
//! `callback.failed`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A run began.
    #[serde(rename = "stage.started")]
    StageStarted,
    /// A run produced a success outcome.
    #[serde(rename = "stage.succeeded")]
    StageSucceeded,
    /// A run produced a failure outcome.
    #[serde(rename = "stage.failed")]
    StageFailed,
    /// A lifecycle callback raised an exception that was isolated.
    #[serde(rename = "callback.failed")]
    CallbackFailed,
    /// A control-flow signal escaped the run.
    #[serde(rename = "signal.escalated")]
    SignalEscalated,
}

impl EventKind {
    /// Returns the dotted event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StageStarted => "stage.started",
            Self::StageSucceeded => "stage.succeeded",
            Self::StageFailed => "stage.failed",
            Self::CallbackFailed => "callback.failed",
            Self::SignalEscalated => "signal.escalated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The invoked stage.
    pub stage: String,
    /// Identifier shared by all events of one run.
    pub run_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Event-specific fields.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl StageEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(kind: EventKind, stage: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            kind,
            stage: stage.into(),
            run_id,
            timestamp: Utc::now(),
            data: serde_json::Value::Null,
        }
    }

    /// Attaches event-specific fields.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}
