//! Top-level invocation: run a stage, report, map the outcome to an exit code.

use serde_json::Value;
use std::fmt;

use crate::config::ProjectConfig;
use crate::context::RunSession;
use crate::core::StageReport;
use crate::errors::{BuildstageError, Result};
use crate::observability::StageLogger;
use crate::params::{RunFlags, RunParameters};
use crate::ports::BuildPorts;
use crate::recovery::{ExitHook, FailureSummary, TryOptions};
use crate::stages::{InclusionDecision, StageRegistry};

/// Result of a completed top-level run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Report of the top-level stage.
    pub report: StageReport,
    /// Failures isolated during the run.
    pub failures: FailureSummary,
}

/// One sub-stage in a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSubStage {
    /// Sub-stage name.
    pub name: &'static str,
    /// Whether it would run.
    pub included: bool,
    /// Why.
    pub reason: &'static str,
}

/// What a run would do, without running anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Requested stage name.
    pub stage: String,
    /// Kind implementing it.
    pub kind: String,
    /// Declared sub-stages in order.
    pub steps: Vec<PlannedSubStage>,
}

impl Plan {
    /// Names of the sub-stages that would run.
    #[must_use]
    pub fn included(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|s| s.included)
            .map(|s| s.name)
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stage == self.kind {
            writeln!(f, "{}", self.stage)?;
        } else {
            writeln!(f, "{} (kind {})", self.stage, self.kind)?;
        }
        for step in &self.steps {
            let mark = if step.included { 'x' } else { ' ' };
            if step.included {
                writeln!(f, "  [{mark}] {}", step.name)?;
            } else {
                writeln!(f, "  [{mark}] {} ({})", step.name, step.reason)?;
            }
        }
        Ok(())
    }
}

/// Runs top-level stages against one configuration and port bundle.
#[derive(Debug)]
pub struct Driver {
    config: ProjectConfig,
    ports: BuildPorts,
    registry: StageRegistry,
}

impl Driver {
    /// Creates a driver with the built-in stages.
    #[must_use]
    pub fn new(config: ProjectConfig, ports: BuildPorts) -> Self {
        Self {
            config,
            ports,
            registry: StageRegistry::with_builtins(),
        }
    }

    /// Replaces the stage registry.
    #[must_use]
    pub fn with_registry(mut self, registry: StageRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Project configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Stage registry.
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    fn resolve_kind(&self, stage: &str) -> Result<String> {
        self.config
            .resolve_stage(stage)
            .map(|r| r.kind)
            .ok_or_else(|| BuildstageError::StageDisabled(stage.to_string()))
    }

    /// Runs `stage` to completion.
    ///
    /// The mode flags implied by the stage kind are added to `params`.
    ///
    /// # Errors
    ///
    /// Lookup and argument errors, or the run's first unrecovered error.
    pub async fn run(
        &self,
        stage: &str,
        params: RunParameters,
        call_site_args: Option<&Value>,
    ) -> Result<RunOutcome> {
        let kind = self.resolve_kind(stage)?;
        let flags = params.flags.union(RunFlags::for_stage_kind(&kind));
        let params = params.with_flags(flags);

        let session = RunSession::new(
            self.config.clone(),
            self.ports.clone(),
            self.registry.clone(),
        );
        tracing::debug!(run_id = %session.run_id(), stage, kind, "Starting run");

        let instance = session.instantiate(stage, params, call_site_args)?;
        let report = instance.run().await?;
        Ok(RunOutcome {
            report,
            failures: session.failure_summary(),
        })
    }

    /// Lists the sub-stages `stage` would run with `params`.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::StageDisabled`] or [`BuildstageError::UnknownStage`].
    pub fn plan(&self, stage: &str, params: &RunParameters) -> Result<Plan> {
        let kind = self.resolve_kind(stage)?;
        let entry = self
            .registry
            .entry(&kind)
            .ok_or_else(|| BuildstageError::UnknownStage {
                name: stage.to_string(),
                kind: kind.clone(),
            })?;
        let steps = entry
            .sub_stages
            .iter()
            .map(|&name| {
                let decision =
                    InclusionDecision::evaluate(name, &entry.sub_stages, &params.only, &params.without);
                PlannedSubStage {
                    name,
                    included: decision.included(),
                    reason: decision.reason(),
                }
            })
            .collect();
        Ok(Plan {
            stage: stage.to_string(),
            kind,
            steps,
        })
    }

    /// Reports the outcome of `run` and ends the invocation through `exit`.
    ///
    /// Fatal errors were reported where they happened and keep their exit
    /// code; any other error goes through the error handler first and exits
    /// with the configured fatal code. A successful run exits 0, with a
    /// warning when failures were recovered along the way.
    pub fn finish(&self, stage: &str, result: Result<RunOutcome>, exit: &dyn ExitHook) -> i32 {
        let logger = StageLogger::new(stage, "red", &RunParameters::new()).with_notices(false);
        let code = match result {
            Ok(outcome) => {
                if outcome.failures.has_failures() {
                    logger.warn(
                        &format!(
                            "Completed with {} recovered failure(s)",
                            outcome.failures.count
                        ),
                        0,
                    );
                    for line in outcome.failures.lines() {
                        logger.warn(&line, 1);
                    }
                }
                0
            }
            Err(err) if err.is_fatal() => {
                if let BuildstageError::Fatal {
                    log_file: Some(path),
                    ..
                } = &err
                {
                    logger.error(&format!("See {} for details", path.display()), 0);
                }
                err.exit_code()
            }
            Err(err) => {
                let err = anyhow::Error::new(err);
                self.ports
                    .errors
                    .handle(&err, 0, &logger, &TryOptions::fatal());
                self.config.project.fatal_exit_code
            }
        };
        exit.exit(code);
        code
    }
}
