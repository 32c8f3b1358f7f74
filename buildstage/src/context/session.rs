//! State shared by every stage of one invocation.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ProjectConfig;
use crate::delegation::DelegationStack;
use crate::errors::{BuildstageError, Result};
use crate::params::RunParameters;
use crate::ports::BuildPorts;
use crate::recovery::{FailureCollector, FailureRecord, FailureSummary};
use crate::stages::{RunnableStage, StageRegistry};

/// One invocation's configuration, ports, registry and failure record.
///
/// Shared by the top-level stage and every stage it delegates to.
pub struct RunSession {
    config: Arc<ProjectConfig>,
    ports: BuildPorts,
    registry: Arc<StageRegistry>,
    failures: Mutex<FailureCollector>,
    run_id: Uuid,
}

impl std::fmt::Debug for RunSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSession")
            .field("run_id", &self.run_id)
            .field("kinds", &self.registry.kinds())
            .finish_non_exhaustive()
    }
}

impl RunSession {
    /// Creates a session.
    #[must_use]
    pub fn new(config: ProjectConfig, ports: BuildPorts, registry: StageRegistry) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            ports,
            registry: Arc::new(registry),
            failures: Mutex::new(FailureCollector::new()),
            run_id: crate::utils::generate_run_id(),
        })
    }

    /// Project configuration.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Collaborator ports.
    #[must_use]
    pub fn ports(&self) -> &BuildPorts {
        &self.ports
    }

    /// Stage registry.
    #[must_use]
    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Identifier of this invocation.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Records an isolated failure.
    pub fn record_failure(&self, record: FailureRecord) {
        self.failures.lock().record_failure(record);
    }

    /// Summary of the failures recorded so far.
    #[must_use]
    pub fn failure_summary(&self) -> FailureSummary {
        self.failures.lock().summary()
    }

    /// Instantiates a top-level stage.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::StageDisabled`] when the configuration disables
    /// the stage, [`BuildstageError::UnknownStage`] when its kind is not
    /// registered, [`BuildstageError::InvalidArgs`] for bad arguments.
    pub fn instantiate(
        self: &Arc<Self>,
        name: &str,
        params: RunParameters,
        call_site_args: Option<&Value>,
    ) -> Result<Box<dyn RunnableStage>> {
        let resolution = self
            .config
            .resolve_stage(name)
            .ok_or_else(|| BuildstageError::StageDisabled(name.to_string()))?;
        let stack = DelegationStack::new().enter(name, self.config.project.max_delegation_depth)?;
        self.registry
            .instantiate(&resolution, self, params, stack, call_site_args)
    }
}
