//! CLI argument parsing using `clap`.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

use buildstage::config::DEFAULT_CONFIG_FILE;
use buildstage::params::{RunFlags, RunParameters, SubStageSelection, WatchedEvent};

/// Command-line arguments for `buildstage`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildstage",
    version,
    about = "Build, package and release JavaScript/TypeScript packages in stages.",
    long_about = None
)]
pub struct CliArgs {
    /// Stage to run (`compile`, `build`, `package`, ... or an alias from the config).
    #[arg(value_name = "STAGE")]
    pub stage: String,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Run only these sub-stages (repeatable, or comma separated).
    #[arg(long, value_name = "SUB_STAGE", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these sub-stages (repeatable, or comma separated).
    #[arg(long, value_name = "SUB_STAGE", value_delimiter = ',')]
    pub without: Vec<String>,

    /// Sub-stages to run when another stage delegates to STAGE.
    #[arg(long = "only-in", value_name = "STAGE=A,B")]
    pub only_in: Vec<String>,

    /// Sub-stages to skip when another stage delegates to STAGE.
    #[arg(long = "without-in", value_name = "STAGE=A,B")]
    pub without_in: Vec<String>,

    /// Call-site arguments for the stage, as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub args: Option<String>,

    /// Enable debug messages.
    #[arg(long)]
    pub debug: bool,

    /// Enable verbose messages.
    #[arg(long)]
    pub verbose: bool,

    /// Log progress of each sub-stage.
    #[arg(long)]
    pub progress: bool,

    /// Log commands and file writes instead of performing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Print which sub-stages would run and exit.
    #[arg(long)]
    pub plan: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDSTAGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// File-watch event that triggered this run (`change`, `add`, ...).
    #[arg(long, value_name = "EVENT", requires = "watched_file")]
    pub watched_event: Option<String>,

    /// File that triggered this run.
    #[arg(long, value_name = "PATH", requires = "watched_event")]
    pub watched_file: Option<String>,

    /// Name of the watcher that triggered this run.
    #[arg(long, value_name = "NAME", requires = "watched_event")]
    pub watcher: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn stage_override(raw: &str) -> Result<(&str, SubStageSelection)> {
    let Some((stage, list)) = raw.split_once('=') else {
        bail!("expected STAGE=A,B, got `{raw}`");
    };
    let stage = stage.trim();
    if stage.is_empty() {
        bail!("missing stage name in `{raw}`");
    }
    Ok((stage, SubStageSelection::parse_list(list)))
}

impl CliArgs {
    /// Mode flags requested on the command line.
    ///
    /// Flags implied by the stage kind are added by the driver.
    pub fn flags(&self) -> RunFlags {
        RunFlags {
            debug: self.debug,
            verbose: self.verbose,
            progress: self.progress,
            dry_run: self.dry_run,
            ..RunFlags::default()
        }
    }

    /// Builds the run parameters for the requested stage.
    ///
    /// # Errors
    ///
    /// When an `--only-in` / `--without-in` value is not `STAGE=A,B`.
    pub fn params(&self) -> Result<RunParameters> {
        let mut params = RunParameters::new()
            .with_only(SubStageSelection::from_values(self.only.clone()))
            .with_without(SubStageSelection::from_values(self.without.clone()))
            .with_flags(self.flags());

        for raw in &self.only_in {
            let (stage, selection) = stage_override(raw)?;
            params.set_stage_override(&format!("only-{stage}"), selection);
        }
        for raw in &self.without_in {
            let (stage, selection) = stage_override(raw)?;
            params.set_stage_override(&format!("without-{stage}"), selection);
        }

        if let (Some(event), Some(file)) = (&self.watched_event, &self.watched_file) {
            let mut watched = WatchedEvent::new(event, file);
            if let Some(watcher) = &self.watcher {
                watched = watched.with_watcher(watcher);
            }
            params = params.with_watched(watched);
        }
        Ok(params)
    }

    /// Parses `--args`.
    ///
    /// # Errors
    ///
    /// When the value is not a JSON object.
    pub fn call_site_args(&self) -> Result<Option<Value>> {
        let Some(raw) = &self.args else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(raw).context("parsing --args as JSON")?;
        if !value.is_object() {
            bail!("--args must be a JSON object");
        }
        Ok(Some(value))
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
