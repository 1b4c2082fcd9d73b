//! Event sink trait and implementations.

use super::{EventKind, StageEvent};
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Receives lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: StageEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic; failures are swallowed by the sink.
    fn try_emit(&self, event: StageEvent);
}

/// Discards every event. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: StageEvent) {}

    fn try_emit(&self, _event: StageEvent) {}
}

/// Writes events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at the given level.
    ///
    /// Levels other than `DEBUG` log at `INFO`.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &StageEvent) {
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.kind,
                stage = %event.stage,
                run_id = %event.run_id,
                data = %event.data,
                "Event: {}", event.kind
            );
        } else {
            info!(
                event_type = %event.kind,
                stage = %event.stage,
                run_id = %event.run_id,
                data = %event.data,
                "Event: {}", event.kind
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.log_event(&event);
    }
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the kinds of the collected events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.read().iter().map(|e| e.kind).collect()
    }

    /// Returns the events of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<StageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drops all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn event(kind: EventKind) -> StageEvent {
        StageEvent::new(kind, "s", Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(event(EventKind::StageStarted)).await;
        NoOpEventSink.try_emit(event(EventKind::StageFailed));

        let sink = LoggingEventSink::debug();
        sink.emit(event(EventKind::StageSucceeded).with_data(json!({"duration_ms": 1.0})))
            .await;
        LoggingEventSink::default().try_emit(event(EventKind::CallbackFailed));
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(event(EventKind::StageStarted)).await;
        sink.try_emit(event(EventKind::StageFailed));
        sink.try_emit(event(EventKind::CallbackFailed));

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.kinds(),
            vec![EventKind::StageStarted, EventKind::StageFailed, EventKind::CallbackFailed]
        );
        assert_eq!(sink.of_kind(EventKind::StageFailed).len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
