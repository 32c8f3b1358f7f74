//! Stage and sub-stage status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a stage instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Constructed, `run()` not called yet.
    #[default]
    NotStarted,
    /// Sub-stages are executing.
    Running,
    /// Every included sub-stage completed.
    Finished,
    /// An unrecovered error escaped a sub-stage.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if `next` is a legal transition from this state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Finished | Self::Failed)
        )
    }
}

/// What happened to one declared sub-stage during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStageOutcome {
    /// The body ran to completion.
    Ran,
    /// The inclusion filter excluded it.
    Skipped,
}

impl fmt::Display for SubStageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ran => write!(f, "ran"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::NotStarted.to_string(), "not_started");
        assert_eq!(StageStatus::Running.to_string(), "running");
        assert_eq!(StageStatus::Finished.to_string(), "finished");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Finished.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(!StageStatus::NotStarted.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(StageStatus::NotStarted.can_transition_to(StageStatus::Running));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Finished));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Failed));
        assert!(!StageStatus::NotStarted.can_transition_to(StageStatus::Finished));
        assert!(!StageStatus::Finished.can_transition_to(StageStatus::Running));
        assert!(!StageStatus::Failed.can_transition_to(StageStatus::Running));
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::NotStarted).unwrap();
        assert_eq!(json, r#""not_started""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::NotStarted);
    }

    #[test]
    fn test_sub_stage_outcome_display() {
        assert_eq!(SubStageOutcome::Ran.to_string(), "ran");
        assert_eq!(SubStageOutcome::Skipped.to_string(), "skipped");
    }
}
