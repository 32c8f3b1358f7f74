//! Per-stage logger.
//!
//! Wraps `tracing` with the stage name, its color tag and the message depth
//! (`log_base_level + level`) as structured fields. Debug, verbose and
//! progress output is gated on the run flags.

use std::fmt;

use crate::params::{RunFlags, RunParameters};

/// Category of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Plain informational line, always shown.
    Log,
    /// Shown with `debug`.
    Debug,
    /// Shown with `verbose`.
    Verbose,
    /// Shown only with both `debug` and `verbose`.
    DebugVerbose,
    /// Shown with `progress`.
    Progress,
    /// Warning, always shown.
    Warn,
    /// Error, always shown.
    Error,
}

/// Which end of a run a notice brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// Before the first sub-stage.
    Start,
    /// After the last sub-stage.
    End,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Logger bound to one stage instance.
#[derive(Debug, Clone)]
pub struct StageLogger {
    stage: String,
    color: &'static str,
    base_level: usize,
    flags: RunFlags,
    notices: bool,
}

impl StageLogger {
    /// Creates a logger for `stage` using the run's flags and depth offset.
    #[must_use]
    pub fn new(stage: impl Into<String>, color: &'static str, params: &RunParameters) -> Self {
        Self {
            stage: stage.into(),
            color,
            base_level: params.log_base_level,
            flags: params.flags,
            notices: true,
        }
    }

    /// Enables or disables start/end notices.
    #[must_use]
    pub fn with_notices(mut self, notices: bool) -> Self {
        self.notices = notices;
        self
    }

    /// The stage this logger is bound to.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Returns true if start/end notices are emitted.
    #[must_use]
    pub fn notices_enabled(&self) -> bool {
        self.notices
    }

    /// Absolute depth of a message logged at `level`.
    #[must_use]
    pub fn depth(&self, level: usize) -> usize {
        self.base_level + level
    }

    /// Returns true if messages of `kind` pass the run flags.
    #[must_use]
    pub fn allows(&self, kind: MessageKind) -> bool {
        match kind {
            MessageKind::Log | MessageKind::Warn | MessageKind::Error => true,
            MessageKind::Debug => self.flags.debug,
            MessageKind::Verbose => self.flags.verbose,
            MessageKind::DebugVerbose => self.flags.debug && self.flags.verbose,
            MessageKind::Progress => self.flags.progress,
        }
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth)
    }

    fn emit(&self, kind: MessageKind, message: &str, level: usize) {
        if !self.allows(kind) {
            return;
        }
        let depth = self.depth(level);
        let pad = Self::indent(depth);
        let stage = self.stage.as_str();
        let color = self.color;
        match kind {
            MessageKind::Log | MessageKind::Progress => {
                tracing::info!(stage, color, depth, "{pad}{message}");
            }
            MessageKind::Debug | MessageKind::Verbose => {
                tracing::debug!(stage, color, depth, "{pad}{message}");
            }
            MessageKind::DebugVerbose => {
                tracing::trace!(stage, color, depth, "{pad}{message}");
            }
            MessageKind::Warn => tracing::warn!(stage, color, depth, "{pad}{message}"),
            MessageKind::Error => tracing::error!(stage, color, depth, "{pad}{message}"),
        }
    }

    /// Logs an informational line.
    pub fn log(&self, message: &str, level: usize) {
        self.emit(MessageKind::Log, message, level);
    }

    /// Logs when `debug` is set.
    pub fn debug(&self, message: &str, level: usize) {
        self.emit(MessageKind::Debug, message, level);
    }

    /// Logs when `verbose` is set.
    pub fn verbose(&self, message: &str, level: usize) {
        self.emit(MessageKind::Verbose, message, level);
    }

    /// Logs when both `debug` and `verbose` are set.
    pub fn debug_verbose(&self, message: &str, level: usize) {
        self.emit(MessageKind::DebugVerbose, message, level);
    }

    /// Logs when `progress` is set.
    pub fn progress(&self, message: &str, level: usize) {
        self.emit(MessageKind::Progress, message, level);
    }

    /// Logs a warning.
    pub fn warn(&self, message: &str, level: usize) {
        self.emit(MessageKind::Warn, message, level);
    }

    /// Logs an error.
    pub fn error(&self, message: &str, level: usize) {
        self.emit(MessageKind::Error, message, level);
    }

    /// Emits a bracketing start/end notice at depth zero of this stage.
    ///
    /// Returns false when notices are disabled and nothing was logged.
    pub fn start_or_end(&self, message: &str, which: Notice) -> bool {
        if !self.notices {
            return false;
        }
        let depth = self.depth(0);
        let pad = Self::indent(depth);
        tracing::info!(
            stage = self.stage.as_str(),
            color = self.color,
            depth,
            notice = %which,
            "{pad}{message}"
        );
        true
    }
}
