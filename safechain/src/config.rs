//! Executor configuration.

use crate::errors::ConfigError;
use crate::events::{EventSink, NoOpEventSink, StageEvent};
use crate::pipeline::{NoSignals, SignalClassifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Plain, serializable executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSettings {
    /// Wire cause of `UNCAUGHT_ERROR` failures.
    #[serde(default = "default_uncaught_message")]
    pub uncaught_message: String,
    /// Whether lifecycle events are sent to the event sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
    /// Maximum number of stages in one chain.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
}

fn default_uncaught_message() -> String {
    "An uncaught error occurred".to_string()
}

fn default_emit_events() -> bool {
    true
}

fn default_max_chain_depth() -> usize {
    64
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            uncaught_message: default_uncaught_message(),
            emit_events: default_emit_events(),
            max_chain_depth: default_max_chain_depth(),
        }
    }
}

impl ExecutorSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chain_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_chain_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.uncaught_message.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "uncaught_message".to_string(),
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the wire cause of `UNCAUGHT_ERROR` failures.
    #[must_use]
    pub fn with_uncaught_message(mut self, message: impl Into<String>) -> Self {
        self.uncaught_message = message.into();
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub const fn with_emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Sets the maximum chain depth.
    #[must_use]
    pub const fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }
}

/// Settings plus the collaborators injected by the host.
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Plain settings.
    pub settings: ExecutorSettings,
    /// Recognizes control-flow signals.
    pub signals: Arc<dyn SignalClassifier>,
    /// Receives lifecycle events.
    pub events: Arc<dyn EventSink>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settings: ExecutorSettings::default(),
            signals: Arc::new(NoSignals),
            events: Arc::new(NoOpEventSink),
        }
    }
}

impl ExecutorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the control-flow signal classifier.
    #[must_use]
    pub fn with_signals(mut self, signals: impl SignalClassifier + 'static) -> Self {
        self.signals = Arc::new(signals);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns true if the error is a control-flow signal.
    #[must_use]
    pub fn is_signal(&self, error: &anyhow::Error) -> bool {
        self.signals.is_control_flow(error)
    }

    pub(crate) fn emit(&self, event: StageEvent) {
        if self.settings.emit_events {
            self.events.try_emit(event);
        }
    }
}

impl fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingEventSink, EventKind};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn test_defaults() {
        let settings = ExecutorSettings::default();
        assert_eq!(settings.uncaught_message, "An uncaught error occurred");
        assert!(settings.emit_events);
        assert_eq!(settings.max_chain_depth, 64);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let settings = ExecutorSettings::from_json(r#"{"max_chain_depth": 8}"#).unwrap();
        assert_eq!(settings, ExecutorSettings::default().with_max_chain_depth(8));
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            ExecutorSettings::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ExecutorSettings::from_json(r#"{"max_chain_depth": 0}"#),
            Err(ConfigError::Invalid { field, .. }) if field == "max_chain_depth"
        ));
        assert!(matches!(
            ExecutorSettings::from_json(r#"{"uncaught_message": "  "}"#),
            Err(ConfigError::Invalid { field, .. }) if field == "uncaught_message"
        ));
    }

    #[test]
    fn test_emit_respects_setting() {
        let sink = Arc::new(CollectingEventSink::new());
        let event = StageEvent::new(EventKind::StageStarted, "s", Uuid::new_v4());

        let config = ExecutorConfig::new().with_events(sink.clone());
        config.emit(event.clone());
        assert_eq!(sink.len(), 1);

        let muted = config.with_settings(ExecutorSettings::new().with_emit_events(false));
        muted.emit(event);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_classifier_from_closure() {
        let config = ExecutorConfig::new()
            .with_signals(|e: &anyhow::Error| e.to_string() == "NEXT_REDIRECT");
        assert!(config.is_signal(&anyhow::anyhow!("NEXT_REDIRECT")));
        assert!(!config.is_signal(&anyhow::anyhow!("boom")));
        assert!(format!("{config:?}").contains("max_chain_depth"));
    }
}
