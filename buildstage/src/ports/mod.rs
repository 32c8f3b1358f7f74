//! Collaborator ports injected into stages.
//!
//! Stage bodies never touch the file system, processes or the network
//! directly; they go through the ports bundled in [`BuildPorts`]. Tests swap
//! in the fakes from [`crate::testing`].

mod commands;
mod compiler;
mod files;
mod publisher;

use std::sync::Arc;

#[cfg(test)]
pub use commands::MockCommandRunner;
pub use commands::{
    CommandOutput, CommandRunner, CommandSpec, DryRunCommandRunner, ProcessCommandRunner,
};
pub use compiler::{CommandCompiler, Compiler, ScssOptions};
pub(crate) use files::split_patterns;
pub use files::{FileAccess, LocalFileAccess};
#[cfg(feature = "github")]
pub use publisher::GithubPublisher;
pub use publisher::{DisabledPublisher, PublishedRelease, ReleasePublisher, ReleaseRequest};

use crate::config::ProjectConfig;
use crate::events::{EventSink, LoggingEventSink};
use crate::recovery::{ErrorHandler, LogFileErrorHandler};

/// Every capability a stage body may use.
#[derive(Clone)]
pub struct BuildPorts {
    /// File system.
    pub files: Arc<dyn FileAccess>,
    /// External commands.
    pub commands: Arc<dyn CommandRunner>,
    /// Compilers and formatters.
    pub compiler: Arc<dyn Compiler>,
    /// Release hosting.
    pub publisher: Arc<dyn ReleasePublisher>,
    /// Central error handler.
    pub errors: Arc<dyn ErrorHandler>,
    /// Lifecycle events.
    pub events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for BuildPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPorts")
            .field("root", &self.files.root())
            .finish_non_exhaustive()
    }
}

impl BuildPorts {
    /// Creates a port bundle from its parts.
    #[must_use]
    pub fn new(
        files: Arc<dyn FileAccess>,
        commands: Arc<dyn CommandRunner>,
        compiler: Arc<dyn Compiler>,
        publisher: Arc<dyn ReleasePublisher>,
        errors: Arc<dyn ErrorHandler>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            files,
            commands,
            compiler,
            publisher,
            errors,
            events,
        }
    }

    /// Production ports for a project on the local disk.
    ///
    /// With `dry_run`, commands (and therefore compiler calls) are logged
    /// instead of executed.
    #[must_use]
    pub fn local(config: &ProjectConfig, dry_run: bool) -> Self {
        let root = config.project.root.clone();
        let commands: Arc<dyn CommandRunner> = if dry_run {
            Arc::new(DryRunCommandRunner)
        } else {
            Arc::new(ProcessCommandRunner::new(root.clone()))
        };
        let compiler = Arc::new(CommandCompiler::new(
            Arc::clone(&commands),
            config.tools.clone(),
        ));
        Self {
            files: Arc::new(LocalFileAccess::new(root)),
            commands,
            compiler,
            publisher: default_publisher(),
            errors: Arc::new(LogFileErrorHandler::from_config(config)),
            events: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Replaces the file port.
    #[must_use]
    pub fn with_files(mut self, files: Arc<dyn FileAccess>) -> Self {
        self.files = files;
        self
    }

    /// Replaces the command runner.
    #[must_use]
    pub fn with_commands(mut self, commands: Arc<dyn CommandRunner>) -> Self {
        self.commands = commands;
        self
    }

    /// Replaces the compiler.
    #[must_use]
    pub fn with_compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Replaces the publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn ReleasePublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Replaces the error handler.
    #[must_use]
    pub fn with_error_handler(mut self, errors: Arc<dyn ErrorHandler>) -> Self {
        self.errors = errors;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

#[cfg(feature = "github")]
fn default_publisher() -> Arc<dyn ReleasePublisher> {
    Arc::new(GithubPublisher::default())
}

#[cfg(not(feature = "github"))]
fn default_publisher() -> Arc<dyn ReleasePublisher> {
    Arc::new(DisabledPublisher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_local_ports_rooted_at_project() {
        let mut config = ProjectConfig::default();
        config.project.root = "/work/lib".into();
        let ports = BuildPorts::local(&config, true);
        assert_eq!(ports.files.root(), Path::new("/work/lib"));
        assert!(format!("{ports:?}").contains("/work/lib"));
    }

    #[tokio::test]
    async fn test_dry_run_ports_do_not_execute() {
        let ports = BuildPorts::local(&ProjectConfig::default(), true);
        let out = ports
            .commands
            .run(&CommandSpec::new("definitely-not-installed"))
            .await
            .unwrap();
        assert_eq!(out.status, 0);
    }
}
