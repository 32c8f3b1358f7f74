//! Assertions for stage reports and collected events.

use crate::core::{StageReport, StageStatus};
use crate::events::CollectingEventSink;

/// Asserts that the report finished successfully.
pub fn assert_finished(report: &StageReport) {
    assert_eq!(
        report.status,
        StageStatus::Finished,
        "Expected stage '{}' to finish, got status: {}",
        report.name,
        report.status
    );
}

/// Asserts which sub-stages ran, in order.
pub fn assert_ran(report: &StageReport, expected: &[&str]) {
    assert_eq!(
        report.ran(),
        expected,
        "Unexpected sub-stages ran in '{}' (skipped: {:?})",
        report.name,
        report.skipped()
    );
}

/// Asserts which sub-stages were skipped, in order.
pub fn assert_skipped(report: &StageReport, expected: &[&str]) {
    assert_eq!(
        report.skipped(),
        expected,
        "Unexpected sub-stages skipped in '{}'",
        report.name
    );
}

/// Asserts that exactly `count` events of `event_type` were emitted.
pub fn assert_event_count(events: &CollectingEventSink, event_type: &str, count: usize) {
    let actual = events.types().iter().filter(|t| *t == event_type).count();
    assert_eq!(
        actual,
        count,
        "Expected {count} '{event_type}' event(s), got {actual}. Events: {:?}",
        events.types()
    );
}
