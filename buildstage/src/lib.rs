//! # Buildstage
//!
//! A stage engine for building, packaging and releasing JavaScript and
//! TypeScript packages.
//!
//! A run executes one named stage. Each stage declares a fixed, ordered list
//! of sub-stages; the engine decides which of them run and in what order,
//! with support for:
//!
//! - **Selective execution**: `only` / `without` filters per run, with
//!   `only-<stage>` / `without-<stage>` overrides for delegated stages
//! - **Stage delegation**: a sub-stage may run another stage as a nested run
//!   (build runs compile, package runs build and snapshot)
//! - **Failure isolation**: `try_run` / `atry` either end the run with a
//!   reported fatal error or record the failure and continue
//! - **Ports**: file access, commands, compilers and release publishing are
//!   injected, so every stage can run against in-memory fakes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use buildstage::prelude::*;
//!
//! let config = load_or_default("buildstage.toml")?;
//! let ports = BuildPorts::local(&config, false);
//! let driver = Driver::new(config, ports);
//!
//! let params = RunParameters::new().with_without("document");
//! let result = driver.run("build", params, None).await;
//! let code = driver.finish("build", result, &ProcessExitHook);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod delegation;
pub mod driver;
pub mod errors;
pub mod events;
pub mod observability;
pub mod params;
pub mod ports;
pub mod recovery;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{load_and_validate, load_or_default, ProjectConfig, StageSetting};
    pub use crate::context::{RunSession, StageContext};
    pub use crate::core::{StageEvent, StageReport, StageStatus, SubStageOutcome};
    pub use crate::driver::{Driver, Plan, RunOutcome};
    pub use crate::errors::{BuildstageError, Result};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::params::{RunFlags, RunParameters, SubStageSelection, WatchedEvent};
    pub use crate::ports::{BuildPorts, CommandSpec, FileAccess};
    pub use crate::recovery::{Attempt, ExitHook, ProcessExitHook, TryOptions};
    pub use crate::stages::{RunnableStage, Stage, StageRegistry, SubStage};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_exposes_the_engine() {
        let registry = StageRegistry::with_builtins();
        assert!(registry.contains("build"));
        assert!(RunParameters::new().only.is_empty());
    }
}
