//! Data model for `buildstage.toml`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level configuration as read from `buildstage.toml`.
///
/// ```toml
/// [project]
/// name = "my-lib"
/// logs_dir = "scripts/logs"
///
/// [tools]
/// test = ["npx", "jest"]
///
/// [stages.compile]
/// ts = { project = "tsconfig.json" }
///
/// [stages]
/// document = false
///
/// [stages.quick]
/// kind = "compile"
/// scss = []
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// `[project]` section.
    pub project: ProjectSection,
    /// `[tools]` section: executables the compiler and stages invoke.
    pub tools: ToolsSection,
    /// `[errors]` section: error-report behaviour.
    pub errors: ErrorsSection,
    /// `[stages.<name>]` tables, `true` or `false`.
    pub stages: BTreeMap<String, StageSetting>,
}

/// `[project]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Package name; `package.json` is consulted when absent.
    pub name: Option<String>,
    /// Project root. Relative roots are resolved against the config file's directory.
    pub root: PathBuf,
    /// Directory for diagnostic error logs, relative to the root.
    pub logs_dir: PathBuf,
    /// Whether stages emit start/end notices.
    pub notices: bool,
    /// Exit code used after a fatal sub-stage failure.
    pub fatal_exit_code: i32,
    /// Maximum nesting of delegated stage runs.
    pub max_delegation_depth: u32,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            root: PathBuf::from("."),
            logs_dir: PathBuf::from("scripts/logs"),
            notices: true,
            fatal_exit_code: 1,
            max_delegation_depth: 8,
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Sass compiler executable.
    pub sass: String,
    /// TypeScript compiler executable.
    pub tsc: String,
    /// Formatter executable.
    pub prettier: String,
    /// Minifier executable.
    pub terser: String,
    /// Git executable.
    pub git: String,
    /// Archiver executable.
    pub zip: String,
    /// Documentation generator executable.
    pub typedoc: String,
    /// Test command (program followed by arguments).
    pub test: Vec<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: "sass".to_string(),
            tsc: "tsc".to_string(),
            prettier: "prettier".to_string(),
            terser: "terser".to_string(),
            git: "git".to_string(),
            zip: "zip".to_string(),
            typedoc: "typedoc".to_string(),
            test: vec!["npm".to_string(), "test".to_string()],
        }
    }
}

/// When the error handler writes a diagnostic log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFilePolicy {
    /// Every handled error is written to a log file.
    Always,
    /// Only reports longer than `max_console_lines`.
    #[default]
    Long,
    /// Never write log files.
    Never,
}

/// `[errors]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsSection {
    /// Log file policy.
    pub write_log: LogFilePolicy,
    /// Reports longer than this are moved to a log file (policy `long`).
    pub max_console_lines: usize,
}

impl Default for ErrorsSection {
    fn default() -> Self {
        Self {
            write_log: LogFilePolicy::Long,
            max_console_lines: 40,
        }
    }
}

/// A `[stages.<name>]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageSetting {
    /// `true` keeps the built-in defaults, `false` disables the stage.
    Toggle(bool),
    /// Argument overrides, optionally with a `kind` alias.
    Args(Map<String, Value>),
}

/// What a stage name resolves to in a given configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResolution {
    /// The stage name as requested.
    pub name: String,
    /// The registered kind that implements it.
    pub kind: String,
    /// Project-level argument overrides (without the `kind` key).
    pub args_override: Option<Value>,
}

/// Key inside a stage table that names the implementing kind.
pub const KIND_KEY: &str = "kind";

impl ProjectConfig {
    /// Returns the raw setting for a stage name.
    #[must_use]
    pub fn stage_setting(&self, name: &str) -> Option<&StageSetting> {
        self.stages.get(name)
    }

    /// Returns true unless the configuration disables the stage.
    #[must_use]
    pub fn is_stage_enabled(&self, name: &str) -> bool {
        !matches!(self.stage_setting(name), Some(StageSetting::Toggle(false)))
    }

    /// Resolves a stage name to its kind and argument override.
    ///
    /// Returns `None` when the stage is disabled; that is the configured
    /// absence of the capability, not an error.
    #[must_use]
    pub fn resolve_stage(&self, name: &str) -> Option<StageResolution> {
        match self.stage_setting(name) {
            Some(StageSetting::Toggle(false)) => None,
            Some(StageSetting::Toggle(true)) | None => Some(StageResolution {
                name: name.to_string(),
                kind: name.to_string(),
                args_override: None,
            }),
            Some(StageSetting::Args(table)) => {
                let mut table = table.clone();
                let kind = match table.remove(KIND_KEY) {
                    Some(Value::String(kind)) => kind,
                    _ => name.to_string(),
                };
                Some(StageResolution {
                    name: name.to_string(),
                    kind,
                    args_override: Some(Value::Object(table)),
                })
            }
        }
    }

    /// Absolute-or-root-relative path of the logs directory.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.logs_dir)
    }
}
