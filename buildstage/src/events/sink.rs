//! Event sink trait and implementations.

use async_trait::async_trait;
use tracing::{debug, info, Level};

use crate::core::StageEvent;

/// Receives lifecycle events from running stages.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    async fn emit(&self, event: StageEvent);

    /// Emits an event from synchronous code.
    ///
    /// Must never fail; problems are logged and suppressed.
    fn try_emit(&self, event: StageEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: StageEvent) {}

    fn try_emit(&self, _event: StageEvent) {}
}

/// Traces every event with its stage and sub-stage as fields.
///
/// The production sink; events land at `debug` unless built with
/// [`LoggingEventSink::info`].
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &StageEvent) {
        let stage = event.str_field("stage").unwrap_or_default();
        let sub_stage = event.str_field("sub_stage").unwrap_or_default();
        let data = serde_json::to_string(&event.data).unwrap_or_default();
        if self.level == Level::INFO {
            info!(
                event_type = %event.event_type,
                stage,
                sub_stage,
                event_data = %data,
                "{} {stage}", event.event_type
            );
        } else {
            debug!(
                event_type = %event.event_type,
                stage,
                sub_stage,
                event_data = %data,
                "{} {stage}", event.event_type
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

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<StageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns the event types in emission order.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    /// Returns the `sub_stage` field of every event of `event_type`, in order.
    #[must_use]
    pub fn sub_stages(&self, event_type: &str) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .filter_map(|e| e.str_field("sub_stage").map(ToString::to_string))
            .collect()
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
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit(StageEvent::new("test")).await;
        sink.try_emit(StageEvent::new("test"));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::info();
        sink.emit(StageEvent::started("build", 0)).await;
        sink.try_emit(StageEvent::completed("build", 1.0));
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(StageEvent::new("event1")).await;
        sink.try_emit(StageEvent::new("event2"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.types(), vec!["event1", "event2"]);
    }

    #[tokio::test]
    async fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        sink.emit(StageEvent::started("build", 0)).await;
        sink.emit(StageEvent::sub_stage_completed("build", "compile", 1.0)).await;
        sink.emit(StageEvent::sub_stage_skipped("build", "test")).await;
        sink.emit(StageEvent::completed("build", 2.0)).await;

        assert_eq!(sink.events_of_type("stage.").len(), 2);
        assert_eq!(sink.sub_stages("substage.completed"), vec!["compile"]);
        assert_eq!(sink.sub_stages("substage.skipped"), vec!["test"]);
    }

    #[tokio::test]
    async fn test_collecting_sink_clear() {
        let sink = CollectingEventSink::new();
        sink.emit(StageEvent::new("event")).await;
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }
}
