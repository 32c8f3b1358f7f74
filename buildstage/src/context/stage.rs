//! Per-stage execution context.

use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::core::{StageEvent, StageReport};
use crate::delegation::{DelegationStack, StageSpawner};
use crate::errors::Result;
use crate::events::EventSink;
use crate::observability::StageLogger;
use crate::params::{RunFlags, RunParameters};
use crate::ports::{BuildPorts, CommandOutput, CommandSpec, Compiler, FileAccess};

use super::RunSession;

/// Everything a sub-stage body can reach.
///
/// Created once per stage instance; the parameters are frozen for the
/// lifetime of the run.
pub struct StageContext {
    name: String,
    kind: &'static str,
    params: Arc<RunParameters>,
    session: Arc<RunSession>,
    logger: StageLogger,
    stack: DelegationStack,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl StageContext {
    /// Creates the context of one stage instance.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: &'static str,
        color: &'static str,
        params: RunParameters,
        session: Arc<RunSession>,
        stack: DelegationStack,
    ) -> Self {
        let name = name.into();
        let logger = StageLogger::new(name.clone(), color, &params)
            .with_notices(session.config().project.notices);
        Self {
            name,
            kind,
            params: Arc::new(params),
            session,
            logger,
            stack,
        }
    }

    /// Stage name as requested (may be an alias).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered kind implementing the stage.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Frozen run parameters.
    #[must_use]
    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Mode flags.
    #[must_use]
    pub fn flags(&self) -> RunFlags {
        self.params.flags
    }

    /// Returns true when commands and writes are only logged.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.params.flags.dry_run
    }

    /// The shared session.
    #[must_use]
    pub fn session(&self) -> &Arc<RunSession> {
        &self.session
    }

    /// Project configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        self.session.config()
    }

    /// Collaborator ports.
    #[must_use]
    pub fn ports(&self) -> &BuildPorts {
        self.session.ports()
    }

    /// File port.
    #[must_use]
    pub fn files(&self) -> &dyn FileAccess {
        self.ports().files.as_ref()
    }

    /// Compiler port.
    #[must_use]
    pub fn compiler(&self) -> &dyn Compiler {
        self.ports().compiler.as_ref()
    }

    /// Stage logger.
    #[must_use]
    pub fn logger(&self) -> &StageLogger {
        &self.logger
    }

    /// Stages currently running, this one last.
    #[must_use]
    pub fn stack(&self) -> &DelegationStack {
        &self.stack
    }

    /// Returns true for the stage the invocation started with.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.stack.is_top_level()
    }

    /// Emits a lifecycle event.
    pub async fn emit(&self, event: StageEvent) {
        self.ports().events.emit(event).await;
    }

    /// Emits a lifecycle event from synchronous code.
    pub fn try_emit(&self, event: StageEvent) {
        self.ports().events.try_emit(event);
    }

    /// Runs another stage to completion as a nested run.
    ///
    /// Returns `None` when the configuration disables the stage.
    ///
    /// # Errors
    ///
    /// Delegation cycles and depth violations fail before the child is
    /// built; errors of the child run propagate unchanged.
    pub async fn run_stage(&self, name: &str, level_offset: usize) -> Result<Option<StageReport>> {
        StageSpawner::new(self.config().project.max_delegation_depth)
            .spawn(self, name, level_offset)
            .await
    }

    /// Runs an external command, or only logs it under `dry_run`.
    ///
    /// # Errors
    ///
    /// Whatever the command runner reports.
    pub async fn exec(&self, command: &CommandSpec, level: usize) -> anyhow::Result<CommandOutput> {
        if self.dry_run() {
            self.logger
                .log(&format!("[dry-run] {}", command.display()), level);
            return Ok(CommandOutput::default());
        }
        self.logger.verbose(&command.display(), level);
        self.ports().commands.run(command).await
    }
}
