//! Central error handler.
//!
//! Every failure caught by `try_run` / `atry` passes through an
//! [`ErrorHandler`] before the engine decides whether it is fatal.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::{LogFilePolicy, ProjectConfig};
use crate::errors::BuildstageError;
use crate::observability::StageLogger;
use crate::utils::file_stamp;

use super::TryOptions;

/// What the handler did with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledError {
    /// Error type name.
    pub name: String,
    /// One-line message (top of the cause chain).
    pub message: String,
    /// The full formatted report.
    pub report: String,
    /// Diagnostic log file, when one was written.
    pub log_file: Option<PathBuf>,
}

/// Formats, logs and optionally persists errors.
pub trait ErrorHandler: Send + Sync {
    /// Handles one error caught at `level` in the logger's stage.
    fn handle(
        &self,
        error: &anyhow::Error,
        level: usize,
        logger: &StageLogger,
        options: &TryOptions,
    ) -> HandledError;
}

/// Type name of the outermost error, used in reports.
///
/// Context layers hide the type underneath them.
#[must_use]
pub fn error_name(error: &anyhow::Error) -> String {
    let Some(outer) = error.chain().next() else {
        return "Error".to_string();
    };
    if let Some(err) = outer.downcast_ref::<BuildstageError>() {
        err.kind().to_string()
    } else if outer.downcast_ref::<std::io::Error>().is_some() {
        "IoError".to_string()
    } else {
        "Error".to_string()
    }
}

/// Formats the name, message and cause chain of an error.
#[must_use]
pub fn format_report(error: &anyhow::Error) -> String {
    let mut report = format!("{}: {error}", error_name(error));
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !causes.is_empty() {
        report.push_str("\n\nCaused by:");
        for (i, cause) in causes.iter().enumerate() {
            let _ = write!(report, "\n    {i}: {cause}");
        }
    }
    report
}

/// Appends a captured backtrace to `report`. Only log files carry it.
fn with_backtrace(report: &str, backtrace: &Backtrace) -> String {
    if backtrace.status() == BacktraceStatus::Captured {
        format!("{report}\n\nBacktrace:\n{backtrace}")
    } else {
        report.to_string()
    }
}

/// Error handler that logs through the stage logger and writes timestamped
/// diagnostic files under the project's logs directory.
#[derive(Debug, Clone)]
pub struct LogFileErrorHandler {
    logs_dir: PathBuf,
    policy: LogFilePolicy,
    max_console_lines: usize,
}

impl LogFileErrorHandler {
    /// Creates a handler writing to `logs_dir` with the default policy.
    #[must_use]
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            policy: LogFilePolicy::Long,
            max_console_lines: 40,
        }
    }

    /// Creates a handler from the `[errors]` and `[project]` sections.
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(config.logs_dir())
            .with_policy(config.errors.write_log)
            .with_max_console_lines(config.errors.max_console_lines)
    }

    /// Sets the log file policy.
    #[must_use]
    pub fn with_policy(mut self, policy: LogFilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the console line budget.
    #[must_use]
    pub fn with_max_console_lines(mut self, lines: usize) -> Self {
        self.max_console_lines = lines;
        self
    }

    /// The directory log files are written to.
    #[must_use]
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    fn should_write(&self, policy: LogFilePolicy, too_long: bool) -> bool {
        match policy {
            LogFilePolicy::Always => true,
            LogFilePolicy::Long => too_long,
            LogFilePolicy::Never => false,
        }
    }

    fn write_log(&self, stage: &str, report: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.logs_dir)?;
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}-{stage}-{}.log", file_stamp(&crate::utils::now_utc()), &suffix[..8]);
        let path = self.logs_dir.join(name);
        std::fs::write(&path, report)?;
        Ok(path)
    }
}

impl ErrorHandler for LogFileErrorHandler {
    fn handle(
        &self,
        error: &anyhow::Error,
        level: usize,
        logger: &StageLogger,
        options: &TryOptions,
    ) -> HandledError {
        let report = format_report(error);
        let too_long = report.lines().count() > self.max_console_lines;
        let policy = options.write_log.unwrap_or(self.policy);

        let log_file = if self.should_write(policy, too_long) {
            match self.write_log(logger.stage(), &with_backtrace(&report, error.backtrace())) {
                Ok(path) => Some(path),
                Err(err) => {
                    logger.warn(&format!("Could not write error log: {err}"), level);
                    None
                }
            }
        } else {
            None
        };

        match (&log_file, too_long) {
            (Some(path), true) => {
                let first = report.lines().next().unwrap_or_default();
                logger.error(first, level);
                logger.error(&format!("Full report written to {}", path.display()), level);
            }
            (Some(path), false) => {
                logger.error(&report, level);
                logger.verbose(&format!("Error report written to {}", path.display()), level);
            }
            (None, _) => logger.error(&report, level),
        }

        HandledError {
            name: error_name(error),
            message: error.to_string(),
            report,
            log_file,
        }
    }
}
