//! Test harness wiring fakes, configuration and registry together.

use serde_json::Value;
use std::sync::Arc;

use crate::config::{ProjectConfig, StageSetting};
use crate::context::RunSession;
use crate::core::StageReport;
use crate::driver::Driver;
use crate::errors::Result;
use crate::events::CollectingEventSink;
use crate::params::RunParameters;
use crate::ports::BuildPorts;
use crate::stages::StageRegistry;

use super::fakes::{
    MemoryFileAccess, RecordingCommandRunner, RecordingCompiler, RecordingErrorHandler,
    RecordingPublisher,
};
use super::scripted::ScriptedStage;

/// Project root used by the harness.
pub const HARNESS_ROOT: &str = "/project";

/// Fakes for every port plus a configuration rooted at [`HARNESS_ROOT`].
///
/// The registry holds the built-in stages and [`ScriptedStage`].
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// Configuration used for every run.
    pub config: ProjectConfig,
    /// In-memory file tree.
    pub files: Arc<MemoryFileAccess>,
    /// Command recorder.
    pub commands: Arc<RecordingCommandRunner>,
    /// Compiler recorder.
    pub compiler: Arc<RecordingCompiler>,
    /// Publisher recorder.
    pub publisher: Arc<RecordingPublisher>,
    /// Error handler recorder.
    pub errors: Arc<RecordingErrorHandler>,
    /// Event collector.
    pub events: Arc<CollectingEventSink>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness with default configuration and empty fakes.
    #[must_use]
    pub fn new() -> Self {
        let mut config = ProjectConfig::default();
        config.project.root = HARNESS_ROOT.into();
        Self {
            config,
            files: Arc::new(MemoryFileAccess::new(HARNESS_ROOT)),
            commands: Arc::new(RecordingCommandRunner::new()),
            compiler: Arc::new(RecordingCompiler::new(HARNESS_ROOT)),
            publisher: Arc::new(RecordingPublisher::new()),
            errors: Arc::new(RecordingErrorHandler::new()),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Edits the configuration.
    #[must_use]
    pub fn with_config(mut self, edit: impl FnOnce(&mut ProjectConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Sets a `[stages.<name>]` entry.
    #[must_use]
    pub fn with_stage(mut self, name: impl Into<String>, setting: StageSetting) -> Self {
        self.config.stages.insert(name.into(), setting);
        self
    }

    /// Sets a `[stages.<name>]` table from a JSON object.
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn with_stage_args(self, name: impl Into<String>, args: Value) -> Self {
        match args {
            Value::Object(table) => self.with_stage(name, StageSetting::Args(table)),
            _ => self,
        }
    }

    /// Port bundle over the fakes.
    #[must_use]
    pub fn ports(&self) -> BuildPorts {
        BuildPorts::new(
            self.files.clone(),
            self.commands.clone(),
            self.compiler.clone(),
            self.publisher.clone(),
            self.errors.clone(),
            self.events.clone(),
        )
    }

    /// Built-in stages plus [`ScriptedStage`].
    #[must_use]
    pub fn registry(&self) -> StageRegistry {
        StageRegistry::with_builtins().register::<ScriptedStage>()
    }

    /// A fresh session.
    #[must_use]
    pub fn session(&self) -> Arc<RunSession> {
        RunSession::new(self.config.clone(), self.ports(), self.registry())
    }

    /// A driver over the harness.
    #[must_use]
    pub fn driver(&self) -> Driver {
        Driver::new(self.config.clone(), self.ports()).with_registry(self.registry())
    }

    /// Instantiates and runs one stage in a fresh session.
    ///
    /// # Errors
    ///
    /// Whatever the run returns.
    pub async fn run(&self, stage: &str, params: RunParameters) -> Result<StageReport> {
        self.run_with_args(stage, params, None).await
    }

    /// Like [`TestHarness::run`] with call-site arguments.
    ///
    /// # Errors
    ///
    /// Whatever the run returns.
    pub async fn run_with_args(
        &self,
        stage: &str,
        params: RunParameters,
        args: Option<&Value>,
    ) -> Result<StageReport> {
        let session = self.session();
        let instance = session.instantiate(stage, params, args)?;
        instance.run().await
    }
}
