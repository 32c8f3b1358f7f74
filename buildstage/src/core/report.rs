//! Summary of one completed stage run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StageStatus, SubStageOutcome};

/// Outcome of one declared sub-stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStageReport {
    /// Sub-stage name.
    pub name: String,
    /// What happened to it.
    pub outcome: SubStageOutcome,
}

/// Report returned by a successful `run()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name as requested.
    pub name: String,
    /// Registered kind that implemented it.
    pub kind: String,
    /// Final status.
    pub status: StageStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
    /// Declared sub-stages in execution order.
    pub sub_stages: Vec<SubStageReport>,
}

impl StageReport {
    /// Starts a report for a run beginning now.
    #[must_use]
    pub fn begin(name: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            kind: kind.into(),
            status: StageStatus::Running,
            started_at: now,
            ended_at: now,
            sub_stages: Vec::new(),
        }
    }

    /// Records a sub-stage outcome.
    pub fn record(&mut self, name: &str, outcome: SubStageOutcome) {
        self.sub_stages.push(SubStageReport {
            name: name.to_string(),
            outcome,
        });
    }

    /// Closes the report with a terminal status.
    #[must_use]
    pub fn finish(mut self, status: StageStatus) -> Self {
        self.status = status;
        self.ended_at = Utc::now();
        self
    }

    /// Names of the sub-stages whose bodies ran, in order.
    #[must_use]
    pub fn ran(&self) -> Vec<&str> {
        self.with_outcome(SubStageOutcome::Ran)
    }

    /// Names of the sub-stages the inclusion filter skipped, in order.
    #[must_use]
    pub fn skipped(&self) -> Vec<&str> {
        self.with_outcome(SubStageOutcome::Skipped)
    }

    fn with_outcome(&self, outcome: SubStageOutcome) -> Vec<&str> {
        self.sub_stages
            .iter()
            .filter(|s| s.outcome == outcome)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_ms(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_records_in_order() {
        let mut report = StageReport::begin("compile", "compile");
        report.record("scss", SubStageOutcome::Skipped);
        report.record("ts", SubStageOutcome::Ran);
        report.record("files", SubStageOutcome::Ran);
        let report = report.finish(StageStatus::Finished);

        assert_eq!(report.ran(), vec!["ts", "files"]);
        assert_eq!(report.skipped(), vec!["scss"]);
        assert_eq!(report.status, StageStatus::Finished);
        assert!(report.ended_at >= report.started_at);
        assert!(report.duration_ms() >= 0.0);
    }
}
