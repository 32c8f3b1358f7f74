//! Failure isolation support.
//!
//! This module provides:
//! - [`Attempt`] and [`TryOptions`] for `try_run` / `atry`
//! - The central [`ErrorHandler`] and its log-file implementation
//! - [`FailureCollector`] for failures a run recovered from
//! - [`ExitHook`], the only way the driver terminates the process

mod attempt;
mod exit;
mod failures;
mod handler;

pub use attempt::{Attempt, TryOptions, FAILED_SENTINEL};
#[cfg(test)]
pub use exit::MockExitHook;
pub use exit::{ExitHook, ProcessExitHook};
pub use failures::{FailureCollector, FailureRecord, FailureSummary};
pub use handler::{error_name, format_report, ErrorHandler, HandledError, LogFileErrorHandler};
