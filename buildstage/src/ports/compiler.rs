//! Compiler port: Sass, TypeScript, formatting and minification.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ToolsSection;

use super::{CommandRunner, CommandSpec};

/// Options for one Sass compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScssOptions {
    /// Output style (`expanded` or `compressed`).
    pub style: String,
    /// Emit a source map next to the output.
    pub source_map: bool,
}

impl Default for ScssOptions {
    fn default() -> Self {
        Self {
            style: "expanded".to_string(),
            source_map: false,
        }
    }
}

/// Compilation and transformation tools.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compiles one stylesheet.
    async fn compile_scss(&self, input: &Path, output: &Path, options: &ScssOptions) -> Result<()>;

    /// Builds a TypeScript project.
    async fn compile_ts(&self, project: &Path, out_dir: Option<&Path>) -> Result<()>;

    /// Formats files in place.
    async fn prettify(&self, files: &[PathBuf]) -> Result<()>;

    /// Minifies one script.
    async fn minimize(&self, input: &Path, output: &Path) -> Result<()>;
}

/// [`Compiler`] that invokes the configured tools through a [`CommandRunner`].
pub struct CommandCompiler {
    runner: Arc<dyn CommandRunner>,
    tools: ToolsSection,
}

impl std::fmt::Debug for CommandCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCompiler")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl CommandCompiler {
    /// Creates a compiler using `tools` and `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, tools: ToolsSection) -> Self {
        Self { runner, tools }
    }

    fn path_arg(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// The `sass` invocation for one stylesheet.
    #[must_use]
    pub fn scss_command(&self, input: &Path, output: &Path, options: &ScssOptions) -> CommandSpec {
        CommandSpec::new(&self.tools.sass)
            .arg(format!("--style={}", options.style))
            .arg(if options.source_map {
                "--source-map"
            } else {
                "--no-source-map"
            })
            .arg(Self::path_arg(input))
            .arg(Self::path_arg(output))
    }

    /// The `tsc` invocation for a project.
    #[must_use]
    pub fn ts_command(&self, project: &Path, out_dir: Option<&Path>) -> CommandSpec {
        let cmd = CommandSpec::new(&self.tools.tsc)
            .arg("-p")
            .arg(Self::path_arg(project));
        match out_dir {
            Some(dir) => cmd.arg("--outDir").arg(Self::path_arg(dir)),
            None => cmd,
        }
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile_scss(&self, input: &Path, output: &Path, options: &ScssOptions) -> Result<()> {
        self.runner
            .run(&self.scss_command(input, output, options))
            .await?;
        Ok(())
    }

    async fn compile_ts(&self, project: &Path, out_dir: Option<&Path>) -> Result<()> {
        self.runner.run(&self.ts_command(project, out_dir)).await?;
        Ok(())
    }

    async fn prettify(&self, files: &[PathBuf]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let cmd = CommandSpec::new(&self.tools.prettier)
            .arg("--write")
            .args(files.iter().map(|f| Self::path_arg(f)));
        self.runner.run(&cmd).await?;
        Ok(())
    }

    async fn minimize(&self, input: &Path, output: &Path) -> Result<()> {
        let cmd = CommandSpec::new(&self.tools.terser)
            .arg(Self::path_arg(input))
            .args(["--compress", "--mangle", "--output"])
            .arg(Self::path_arg(output));
        self.runner.run(&cmd).await?;
        Ok(())
    }
}
