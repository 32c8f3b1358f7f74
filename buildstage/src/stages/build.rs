//! `build`: compile, post-process, test and document.

use anyhow::Context as _;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::StageContext;
use crate::recovery::{Attempt, TryOptions};

use super::project_info::ProjectInfo;
use super::{Stage, SubStage};

/// Sub-stages of [`BuildStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Delegates to `compile`.
    Compile,
    /// Regex replacements in built files.
    Replace,
    /// Formats built files.
    Prettify,
    /// Minifies built scripts.
    Minimize,
    /// Delegates to `test`.
    Test,
    /// Delegates to `document`.
    Document,
}

impl SubStage for BuildStep {
    fn name(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Replace => "replace",
            Self::Prettify => "prettify",
            Self::Minimize => "minimize",
            Self::Test => "test",
            Self::Document => "document",
        }
    }
}

/// One regex replacement.
///
/// `{{name}}` and `{{version}}` in `replacement` expand to the project's
/// name and version before the regex runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Glob patterns of files to edit.
    pub files: Vec<String>,
    /// Regular expression to search for.
    pub pattern: String,
    /// Replacement text (`$1` style group references allowed).
    pub replacement: String,
}

/// Arguments of [`BuildStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildArgs {
    /// Version used by replacements; `package.json` when absent.
    pub version: Option<String>,
    /// Replacements, applied in order.
    pub replacements: Vec<Replacement>,
    /// Files to format.
    pub prettify: Vec<String>,
    /// Scripts to minify; each `x.js` produces `x.min.js` next to it.
    pub minimize: Vec<String>,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            version: None,
            replacements: Vec::new(),
            prettify: vec!["dist/**/*.js".to_string(), "dist/**/*.css".to_string()],
            minimize: vec!["dist/**/*.js".to_string(), "!dist/**/*.min.js".to_string()],
        }
    }
}

/// Builds the project.
#[derive(Debug)]
pub struct BuildStage {
    args: BuildArgs,
}

fn minimized_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.min.js"))
}

impl BuildStage {
    async fn replace(&self, cx: &StageContext) -> anyhow::Result<()> {
        if self.args.replacements.is_empty() {
            cx.logger().verbose("No replacements configured", 1);
            return Ok(());
        }
        let mut info = ProjectInfo::load(cx).await?;
        if self.args.version.is_some() {
            info.version.clone_from(&self.args.version);
        }

        for replacement in &self.args.replacements {
            let regex = Regex::new(&replacement.pattern)
                .with_context(|| format!("invalid pattern `{}`", replacement.pattern))?;
            let with = info.expand(&replacement.replacement);
            let mut changed = 0;
            for file in cx.files().glob(&replacement.files).await? {
                let contents = cx.files().read(&file).await?;
                let updated = regex.replace_all(&contents, with.as_str());
                if updated == contents {
                    continue;
                }
                changed += 1;
                let rel = cx.files().relative(&file);
                if cx.dry_run() {
                    cx.logger()
                        .log(&format!("[dry-run] would update {}", rel.display()), 2);
                } else {
                    cx.files().write(&file, &updated).await?;
                    cx.logger().debug(&format!("updated {}", rel.display()), 2);
                }
            }
            cx.logger().verbose(
                &format!("/{}/ -> {with:?}: {changed} file(s)", replacement.pattern),
                1,
            );
        }
        Ok(())
    }

    async fn prettify(&self, cx: &StageContext) -> anyhow::Result<()> {
        let files = cx.files().glob(&self.args.prettify).await?;
        if files.is_empty() {
            cx.logger().verbose("Nothing to prettify", 1);
            return Ok(());
        }
        cx.logger().log(&format!("Formatting {} file(s)", files.len()), 1);
        cx.compiler().prettify(&files).await
    }

    async fn minimize(&self, cx: &StageContext) -> anyhow::Result<()> {
        let files = cx.files().glob(&self.args.minimize).await?;
        if files.is_empty() {
            cx.logger().verbose("Nothing to minimize", 1);
            return Ok(());
        }
        for input in &files {
            let output = minimized_path(input);
            cx.logger().verbose(
                &format!(
                    "{} -> {}",
                    cx.files().relative(input).display(),
                    cx.files().relative(&output).display()
                ),
                2,
            );
            cx.compiler().minimize(input, &output).await?;
        }
        cx.logger().log(&format!("Minimized {} file(s)", files.len()), 1);
        Ok(())
    }

    /// Runs the test stage; a failure is recorded instead of ending the
    /// build while packaging.
    async fn test(&self, cx: &StageContext) -> anyhow::Result<()> {
        let options = if cx.flags().packaging {
            TryOptions::recoverable()
        } else {
            TryOptions::fatal()
        };
        let attempt = cx
            .atry(
                async { cx.run_stage("test", 1).await.map_err(anyhow::Error::from) },
                1,
                options,
            )
            .await?;
        if let Attempt::Failed = attempt {
            cx.logger().warn("Tests failed; continuing to package", 1);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for BuildStage {
    const KIND: &'static str = "build";
    const COLOR: &'static str = "blue";

    type Step = BuildStep;
    type Args = BuildArgs;

    fn steps() -> &'static [BuildStep] {
        &[
            BuildStep::Compile,
            BuildStep::Replace,
            BuildStep::Prettify,
            BuildStep::Minimize,
            BuildStep::Test,
            BuildStep::Document,
        ]
    }

    fn from_args(args: BuildArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: BuildStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            BuildStep::Compile => {
                cx.run_stage("compile", 1).await?;
                Ok(())
            }
            BuildStep::Replace => self.replace(cx).await,
            BuildStep::Prettify => self.prettify(cx).await,
            BuildStep::Minimize => self.minimize(cx).await,
            BuildStep::Test => self.test(cx).await,
            BuildStep::Document => {
                cx.run_stage("document", 1).await?;
                Ok(())
            }
        }
    }
}
