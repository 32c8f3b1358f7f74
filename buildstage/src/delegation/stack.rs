//! In-progress stage stack carried through delegation.

use serde::{Deserialize, Serialize};

use crate::errors::{BuildstageError, Result};

/// Default maximum delegation depth.
pub const DEFAULT_MAX_DEPTH: u32 = 8;

/// Names of the stages currently running, outermost first.
///
/// Each delegated run gets its own extended copy; entering a stage that is
/// already on the stack fails fast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationStack {
    stages: Vec<String>,
}

impl DelegationStack {
    /// Creates an empty stack (nothing running).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `stage` pushed on top.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::DelegationCycle`] when `stage` is already running,
    /// [`BuildstageError::DelegationDepth`] when the nesting would exceed
    /// `max_depth`.
    pub fn enter(&self, stage: &str, max_depth: u32) -> Result<Self> {
        if self.contains(stage) {
            let mut path = self.stages.clone();
            path.push(stage.to_string());
            return Err(BuildstageError::DelegationCycle { path });
        }
        if self.nesting() >= max_depth as usize + 1 {
            return Err(BuildstageError::DelegationDepth {
                stage: stage.to_string(),
                max_depth,
            });
        }
        let mut stages = self.stages.clone();
        stages.push(stage.to_string());
        Ok(Self { stages })
    }

    /// Returns true if `stage` is running.
    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.stages.iter().any(|s| s == stage)
    }

    /// Number of running stages.
    #[must_use]
    pub fn nesting(&self) -> usize {
        self.stages.len()
    }

    /// Returns true when the innermost stage is the top-level one.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.stages.len() <= 1
    }

    /// The innermost running stage.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.stages.last().map(String::as_str)
    }

    /// Running stages, outermost first.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.stages
    }
}

impl std::fmt::Display for DelegationStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stages.join(" -> "))
    }
}
