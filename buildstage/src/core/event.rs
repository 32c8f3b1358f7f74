//! Lifecycle events emitted by the stage engine.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// An event emitted while stages run.
///
/// Events are consumed by an [`EventSink`](crate::events::EventSink); in
/// production they end up as structured log lines, in tests they are
/// collected and asserted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The event type (e.g. `stage.started`, `substage.skipped`).
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl StageEvent {
    /// Creates an event with an empty payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: BTreeMap::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a payload field as a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// `stage.started`
    #[must_use]
    pub fn started(stage: &str, depth: usize) -> Self {
        Self::new("stage.started")
            .add_data("stage", json!(stage))
            .add_data("depth", json!(depth))
    }

    /// `stage.completed`
    #[must_use]
    pub fn completed(stage: &str, duration_ms: f64) -> Self {
        Self::new("stage.completed")
            .add_data("stage", json!(stage))
            .add_data("duration_ms", json!(duration_ms))
    }

    /// `stage.failed`
    #[must_use]
    pub fn failed(stage: &str, sub_stage: &str, error: &str) -> Self {
        Self::new("stage.failed")
            .add_data("stage", json!(stage))
            .add_data("sub_stage", json!(sub_stage))
            .add_data("error", json!(error))
    }

    /// `substage.skipped`
    #[must_use]
    pub fn sub_stage_skipped(stage: &str, sub_stage: &str) -> Self {
        Self::new("substage.skipped")
            .add_data("stage", json!(stage))
            .add_data("sub_stage", json!(sub_stage))
    }

    /// `substage.completed`
    #[must_use]
    pub fn sub_stage_completed(stage: &str, sub_stage: &str, duration_ms: f64) -> Self {
        Self::new("substage.completed")
            .add_data("stage", json!(stage))
            .add_data("sub_stage", json!(sub_stage))
            .add_data("duration_ms", json!(duration_ms))
    }

    /// `stage.delegated`: a parent started a nested run.
    #[must_use]
    pub fn delegated(parent: &str, child: &str, kind: &str) -> Self {
        Self::new("stage.delegated")
            .add_data("parent", json!(parent))
            .add_data("stage", json!(child))
            .add_data("kind", json!(kind))
    }

    /// `stage.disabled`: delegation into a disabled stage was skipped.
    #[must_use]
    pub fn disabled(parent: &str, child: &str) -> Self {
        Self::new("stage.disabled")
            .add_data("parent", json!(parent))
            .add_data("stage", json!(child))
    }

    /// `failure.recovered`: an isolated failure was recorded and the run continued.
    #[must_use]
    pub fn recovered(stage: &str, error: &str) -> Self {
        Self::new("failure.recovered")
            .add_data("stage", json!(stage))
            .add_data("error", json!(error))
    }

    /// Custom event emitted by a sub-stage body.
    #[must_use]
    pub fn custom(stage: &str, event_type: impl Into<String>) -> Self {
        Self::new(event_type).add_data("stage", json!(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = StageEvent::new("test.event");
        assert_eq!(event.event_type, "test.event");
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_event_add_data() {
        let event = StageEvent::new("test.event")
            .add_data("foo", json!("bar"))
            .add_data("count", json!(42));

        assert_eq!(event.data.len(), 2);
        assert_eq!(event.str_field("foo"), Some("bar"));
        assert_eq!(event.str_field("count"), None);
    }

    #[test]
    fn test_sub_stage_events() {
        let skipped = StageEvent::sub_stage_skipped("compile", "scss");
        assert_eq!(skipped.event_type, "substage.skipped");
        assert_eq!(skipped.str_field("sub_stage"), Some("scss"));

        let done = StageEvent::sub_stage_completed("compile", "ts", 12.0);
        assert_eq!(done.data.get("duration_ms"), Some(&json!(12.0)));
    }

    #[test]
    fn test_delegated_event() {
        let event = StageEvent::delegated("package", "build", "build");
        assert_eq!(event.str_field("parent"), Some("package"));
        assert_eq!(event.str_field("stage"), Some("build"));
    }

    #[test]
    fn test_event_serialization() {
        let event = StageEvent::started("build", 0);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"stage.started""#));

        let deserialized: StageEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }
}
