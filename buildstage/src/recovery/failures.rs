//! Recoverable failures recorded during a run.
//!
//! Failures isolated with `exit_process = false` do not stop the run; they
//! are recorded here so the driver can report them at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Record of one isolated failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage the failure happened in.
    pub stage: String,
    /// Error message (top of the cause chain).
    pub error: String,
    /// Error type name.
    pub error_type: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// Diagnostic log file written for it, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(stage: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            error: error.into(),
            error_type: "Error".to_string(),
            timestamp: Utc::now(),
            log_file: None,
        }
    }

    /// Sets the error type.
    #[must_use]
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    /// Attaches the diagnostic log file.
    #[must_use]
    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }
}

/// Summary of the failures of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Number of recorded failures.
    pub count: usize,
    /// Stages that recorded at least one failure, in first-failure order.
    pub stages: Vec<String>,
    /// All records.
    pub failures: Vec<FailureRecord>,
}

impl FailureSummary {
    /// Returns true if any failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.count > 0
    }

    /// One line per failure, suitable for an end-of-run warning.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| match &f.log_file {
                Some(path) => format!("{}: {} (see {})", f.stage, f.error, path.display()),
                None => format!("{}: {}", f.stage, f.error),
            })
            .collect()
    }
}

/// Collects isolated failures across a run, including delegated stages.
#[derive(Debug, Default)]
pub struct FailureCollector {
    failures: Vec<FailureRecord>,
}

impl FailureCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.
    pub fn record_failure(&mut self, record: FailureRecord) {
        self.failures.push(record);
    }

    /// Returns true if `stage` recorded a failure.
    #[must_use]
    pub fn has_failed(&self, stage: &str) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }

    /// Returns true if anything was recorded.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns the recorded failures.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Builds a summary.
    #[must_use]
    pub fn summary(&self) -> FailureSummary {
        let mut stages: Vec<String> = Vec::new();
        for failure in &self.failures {
            if !stages.contains(&failure.stage) {
                stages.push(failure.stage.clone());
            }
        }
        FailureSummary {
            count: self.failures.len(),
            stages,
            failures: self.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failure_record_creation() {
        let record = FailureRecord::new("test", "3 specs failed")
            .with_error_type("CommandError")
            .with_log_file(Some(PathBuf::from("logs/x.log")));

        assert_eq!(record.stage, "test");
        assert_eq!(record.error_type, "CommandError");
        assert_eq!(record.log_file, Some(PathBuf::from("logs/x.log")));
    }

    #[test]
    fn test_collector_records_in_order() {
        let mut collector = FailureCollector::new();
        assert!(!collector.has_failures());

        collector.record_failure(FailureRecord::new("test", "first"));
        collector.record_failure(FailureRecord::new("document", "second"));
        collector.record_failure(FailureRecord::new("test", "third"));

        assert!(collector.has_failed("test"));
        assert!(!collector.has_failed("build"));

        let summary = collector.summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.stages, vec!["test", "document"]);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_summary_lines() {
        let mut collector = FailureCollector::new();
        collector.record_failure(FailureRecord::new("test", "boom"));
        collector.record_failure(
            FailureRecord::new("document", "bang")
                .with_log_file(Some(PathBuf::from("logs/doc.log"))),
        );

        assert_eq!(
            collector.summary().lines(),
            vec![
                "test: boom".to_string(),
                "document: bang (see logs/doc.log)".to_string()
            ]
        );
    }
}
