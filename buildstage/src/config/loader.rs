//! Loading `buildstage.toml`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::model::ProjectConfig;
use super::validate::validate_config;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "buildstage.toml";

/// Reads and parses a configuration file without semantic validation.
///
/// A relative `[project].root` is resolved against the file's directory.
///
/// # Errors
///
/// When the file cannot be read or is not valid TOML for [`ProjectConfig`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;

    let mut config: ProjectConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {}", path.display()))?;

    config.project.root = resolve_root(&config.project.root, config_dir(path));
    Ok(config)
}

/// Like [`load_from_path`], but a missing file yields the defaults rooted at
/// the file's directory.
///
/// # Errors
///
/// When the file exists but cannot be read or parsed.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();
    if path.exists() {
        return load_from_path(path);
    }
    tracing::debug!(path = %path.display(), "No config file; using defaults");
    let mut config = ProjectConfig::default();
    config.project.root = resolve_root(&config.project.root, config_dir(path));
    Ok(config)
}

/// Loads (or defaults) the configuration and validates it against the
/// registered stage kinds.
///
/// # Errors
///
/// Load errors, or the first validation problem found.
pub fn load_and_validate(path: impl AsRef<Path>, known_kinds: &[&str]) -> Result<ProjectConfig> {
    let config = load_or_default(&path)?;
    validate_config(&config, known_kinds)
        .with_context(|| format!("validating {}", path.as_ref().display()))?;
    Ok(config)
}

/// Returns the default configuration path.
#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

fn config_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn resolve_root(root: &Path, base: &Path) -> PathBuf {
    if root.is_absolute() {
        return root.to_path_buf();
    }
    if root == Path::new(".") {
        base.to_path_buf()
    } else {
        base.join(root)
    }
}
