//! Error types for the buildstage engine.
//!
//! Sub-stage bodies and port implementations work with [`anyhow::Result`];
//! everything that crosses the engine boundary is a [`BuildstageError`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for buildstage operations.
#[derive(Debug, Error)]
pub enum BuildstageError {
    /// The project configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No stage kind is registered under the requested name.
    #[error("Unknown stage '{name}' (kind '{kind}')")]
    UnknownStage {
        /// The requested stage name.
        name: String,
        /// The kind the name resolved to.
        kind: String,
    },

    /// The requested top-level stage is disabled in the project configuration.
    #[error("Stage '{0}' is disabled in the project configuration")]
    StageDisabled(String),

    /// A stage delegated into a stage that is already running.
    #[error("Stage delegation cycle: {}", .path.join(" -> "))]
    DelegationCycle {
        /// The in-progress stages, ending with the re-entered one.
        path: Vec<String>,
    },

    /// Delegation went deeper than the configured maximum.
    #[error("Maximum stage delegation depth ({max_depth}) exceeded while starting '{stage}'")]
    DelegationDepth {
        /// The stage that could not be started.
        stage: String,
        /// The configured maximum depth.
        max_depth: u32,
    },

    /// Stage arguments could not be deserialized into the stage's argument type.
    #[error("Invalid arguments for stage '{stage}': {message}")]
    InvalidArgs {
        /// The stage name.
        stage: String,
        /// Deserialization message.
        message: String,
    },

    /// A sub-stage body returned an error that was not isolated.
    #[error("Sub-stage '{stage}.{sub_stage}' failed: {source}")]
    SubStage {
        /// The stage name.
        stage: String,
        /// The sub-stage name.
        sub_stage: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// An error already reported by the error handler that must end the run.
    #[error("Fatal error in '{stage}': {message}")]
    Fatal {
        /// The stage the failure happened in.
        stage: String,
        /// One-line summary of the handled error.
        message: String,
        /// Diagnostic log file written by the handler, if any.
        log_file: Option<PathBuf>,
        /// Exit code the driver should terminate with.
        exit_code: i32,
    },

    /// An external command exited unsuccessfully.
    #[error("Command `{command}` failed with {status}{}", stderr_suffix(.stderr))]
    Command {
        /// The rendered command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A stage instance was used outside its lifecycle.
    #[error("Stage '{stage}' cannot run from state '{state}'")]
    InvalidState {
        /// The stage name.
        stage: String,
        /// The current state.
        state: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl BuildstageError {
    /// Creates a sub-stage error.
    #[must_use]
    pub fn sub_stage(
        stage: impl Into<String>,
        sub_stage: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::SubStage {
            stage: stage.into(),
            sub_stage: sub_stage.into(),
            source,
        }
    }

    /// Returns true if the error was already reported and must end the process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Exit code the driver uses for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fatal { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }

    /// Short error kind used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::UnknownStage { .. } => "UnknownStage",
            Self::StageDisabled(_) => "StageDisabled",
            Self::DelegationCycle { .. } => "DelegationCycle",
            Self::DelegationDepth { .. } => "DelegationDepth",
            Self::InvalidArgs { .. } => "InvalidArgs",
            Self::SubStage { .. } => "SubStageError",
            Self::Fatal { .. } => "Fatal",
            Self::Command { .. } => "CommandError",
            Self::InvalidState { .. } => "InvalidState",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IoError",
        }
    }
}

impl From<serde_json::Error> for BuildstageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T, E = BuildstageError> = std::result::Result<T, E>;
