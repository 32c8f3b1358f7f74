//! Logging setup for `buildstage` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BUILDSTAGE_LOG` environment variable (any `EnvFilter` directive)
//! 3. `trace` with `--verbose`, `debug` with `--debug`, otherwise `info`

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, LogLevel};

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "BUILDSTAGE_LOG";

/// Initialise the global logging subscriber, writing to stderr.
///
/// Call once at startup.
///
/// # Errors
///
/// When the filter directive is invalid or a subscriber is already set.
pub fn init_logging(args: &CliArgs) -> Result<()> {
    let directive = filter_directive(args, std::env::var(LOG_ENV).ok().as_deref());
    let filter = EnvFilter::try_new(&directive)
        .map_err(|err| anyhow!("invalid log filter `{directive}`: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|err| anyhow!("installing the log subscriber: {err}"))
}

/// Picks the filter directive from the flags and the environment value.
pub fn filter_directive(args: &CliArgs, env: Option<&str>) -> String {
    if let Some(level) = args.log_level {
        return level_name(level).to_string();
    }
    if let Some(env) = env.map(str::trim).filter(|s| !s.is_empty()) {
        return env.to_string();
    }
    let default = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    default.to_string()
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Routes panics outside failure isolation through `tracing`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = info
            .payload()
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        tracing::error!(location = %location, "panicked: {message}");
    }));
}
