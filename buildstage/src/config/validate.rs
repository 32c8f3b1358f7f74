//! Semantic checks on a loaded configuration.

use serde_json::Value;

use super::model::{ProjectConfig, StageSetting, KIND_KEY};
use crate::errors::{BuildstageError, Result};

/// Validates a configuration against the registered stage kinds.
///
/// Checks that:
/// - every `[stages.<name>]` resolves to a registered kind
/// - `kind` keys are strings
/// - `max_delegation_depth` is at least 1
/// - `logs_dir` is not empty
///
/// # Errors
///
/// [`BuildstageError::Config`] describing the first problem found.
pub fn validate_config(config: &ProjectConfig, known_kinds: &[&str]) -> Result<()> {
    validate_project(config)?;
    for (name, setting) in &config.stages {
        let StageSetting::Args(table) = setting else {
            if !known_kinds.contains(&name.as_str()) {
                return Err(BuildstageError::Config(format!(
                    "[stages.{name}] has no kind and '{name}' is not a registered stage"
                )));
            }
            continue;
        };
        let kind = match table.get(KIND_KEY) {
            None => name.as_str(),
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => {
                return Err(BuildstageError::Config(format!(
                    "[stages.{name}].kind must be a string, got {other}"
                )))
            }
        };
        if !known_kinds.contains(&kind) {
            return Err(BuildstageError::Config(format!(
                "[stages.{name}] refers to unknown kind '{kind}' (known: {})",
                known_kinds.join(", ")
            )));
        }
    }
    Ok(())
}

fn validate_project(config: &ProjectConfig) -> Result<()> {
    if config.project.max_delegation_depth == 0 {
        return Err(BuildstageError::Config(
            "[project].max_delegation_depth must be >= 1 (got 0)".to_string(),
        ));
    }
    if config.project.logs_dir.as_os_str().is_empty() {
        return Err(BuildstageError::Config(
            "[project].logs_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
