//! Outcome of a failure-isolated call.

use std::fmt;

use crate::config::LogFilePolicy;

/// Text form of a swallowed failure.
pub const FAILED_SENTINEL: &str = "FAILED";

/// Result of `try_run` / `atry` when the failure did not end the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The call succeeded; its value passes through unchanged.
    Completed(T),
    /// The call failed, was handled and recorded, and the run continues.
    Failed,
}

impl<T> Attempt<T> {
    /// Returns true for the failure sentinel.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns the completed value, if any.
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed => None,
        }
    }

    /// Maps the completed value.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Self::Completed(value) => Attempt::Completed(f(value)),
            Self::Failed => Attempt::Failed,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Attempt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(value) => write!(f, "{value}"),
            Self::Failed => write!(f, "{FAILED_SENTINEL}"),
        }
    }
}

/// Options for a failure-isolated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryOptions {
    /// When true (the default) a failure is fatal for the whole run.
    pub exit_process: bool,
    /// Overrides the configured log file policy for this call.
    pub write_log: Option<LogFilePolicy>,
}

impl Default for TryOptions {
    fn default() -> Self {
        Self {
            exit_process: true,
            write_log: None,
        }
    }
}

impl TryOptions {
    /// Fatal on failure.
    #[must_use]
    pub fn fatal() -> Self {
        Self::default()
    }

    /// Recoverable: record the failure and continue.
    #[must_use]
    pub fn recoverable() -> Self {
        Self {
            exit_process: false,
            ..Self::default()
        }
    }

    /// Sets `exit_process`.
    #[must_use]
    pub fn with_exit_process(mut self, exit_process: bool) -> Self {
        self.exit_process = exit_process;
        self
    }

    /// Overrides the log file policy.
    #[must_use]
    pub fn with_write_log(mut self, policy: LogFilePolicy) -> Self {
        self.write_log = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_accessors() {
        let ok: Attempt<u32> = Attempt::Completed(7);
        assert!(!ok.is_failed());
        assert_eq!(ok.clone().completed(), Some(7));
        assert_eq!(ok.map(|v| v * 2), Attempt::Completed(14));

        let failed: Attempt<u32> = Attempt::Failed;
        assert!(failed.is_failed());
        assert_eq!(failed.completed(), None);
    }

    #[test]
    fn test_failed_displays_sentinel() {
        assert_eq!(Attempt::<String>::Failed.to_string(), "FAILED");
        assert_eq!(Attempt::Completed("dist/app.js").to_string(), "dist/app.js");
    }

    #[test]
    fn test_try_options_default_is_fatal() {
        assert!(TryOptions::default().exit_process);
        assert!(!TryOptions::recoverable().exit_process);
        assert_eq!(
            TryOptions::fatal().with_write_log(LogFilePolicy::Always).write_log,
            Some(LogFilePolicy::Always)
        );
    }
}
