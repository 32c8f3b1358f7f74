//! Project configuration.
//!
//! Responsibilities:
//! - The TOML-backed data model (`model.rs`)
//! - Loading `buildstage.toml` from disk (`loader.rs`)
//! - Validating stage references (`validate.rs`)
//! - Layering stage arguments (`args.rs`)

pub mod args;
pub mod loader;
pub mod model;
pub mod validate;

pub use args::{merge_args, resolve_args};
pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_or_default, DEFAULT_CONFIG_FILE,
};
pub use model::{
    ErrorsSection, LogFilePolicy, ProjectConfig, ProjectSection, StageResolution, StageSetting,
    ToolsSection, KIND_KEY,
};
pub use validate::validate_config;
