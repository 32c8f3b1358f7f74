//! `compile`: stylesheets, the TypeScript project and static files.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::StageContext;
use crate::ports::ScssOptions;

use super::{Stage, SubStage};

/// Sub-stages of [`CompileStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStep {
    /// Compile every configured stylesheet.
    Scss,
    /// Build the TypeScript project.
    Ts,
    /// Copy static files into the output directory.
    Files,
}

impl SubStage for CompileStep {
    fn name(self) -> &'static str {
        match self {
            Self::Scss => "scss",
            Self::Ts => "ts",
            Self::Files => "files",
        }
    }
}

/// One stylesheet to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScssEntry {
    /// Source stylesheet, relative to the root.
    pub input: PathBuf,
    /// Output file, relative to the root.
    pub output: PathBuf,
}

/// The TypeScript project to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsProject {
    /// Path of the `tsconfig` file.
    pub project: PathBuf,
    /// Overrides the project's `outDir`.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

/// Arguments of [`CompileStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileArgs {
    /// Output directory for copied files.
    pub out_dir: PathBuf,
    /// Stylesheets to compile.
    pub scss: Vec<ScssEntry>,
    /// Sass options applied to every entry.
    pub scss_options: ScssOptions,
    /// TypeScript project; skipped when absent or when the file is missing.
    pub ts: Option<TsProject>,
    /// Glob patterns of files to copy (`!` excludes).
    pub files: Vec<String>,
    /// Directory the copied paths are taken relative to.
    pub files_base: PathBuf,
}

impl Default for CompileArgs {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("dist"),
            scss: Vec::new(),
            scss_options: ScssOptions::default(),
            ts: Some(TsProject {
                project: PathBuf::from("tsconfig.json"),
                out_dir: None,
            }),
            files: Vec::new(),
            files_base: PathBuf::from("src"),
        }
    }
}

/// Compiles sources into the output directory.
#[derive(Debug)]
pub struct CompileStage {
    args: CompileArgs,
}

impl CompileStage {
    async fn scss(&self, cx: &StageContext) -> anyhow::Result<()> {
        if self.args.scss.is_empty() {
            cx.logger().verbose("No stylesheets configured", 1);
            return Ok(());
        }
        for entry in &self.args.scss {
            if !cx.files().is_file(&entry.input).await {
                bail!("stylesheet {} not found", entry.input.display());
            }
            cx.logger().log(
                &format!("{} -> {}", entry.input.display(), entry.output.display()),
                1,
            );
            cx.compiler()
                .compile_scss(
                    &cx.files().resolve(&entry.input),
                    &cx.files().resolve(&entry.output),
                    &self.args.scss_options,
                )
                .await
                .with_context(|| format!("compiling {}", entry.input.display()))?;
        }
        Ok(())
    }

    async fn ts(&self, cx: &StageContext) -> anyhow::Result<()> {
        let Some(ts) = &self.args.ts else {
            cx.logger().verbose("No TypeScript project configured", 1);
            return Ok(());
        };
        if !cx.files().is_file(&ts.project).await {
            cx.logger().verbose(
                &format!("No TypeScript project at {}; skipping", ts.project.display()),
                1,
            );
            return Ok(());
        }
        cx.logger().log(&format!("tsc -p {}", ts.project.display()), 1);
        let out_dir = ts.out_dir.as_deref().map(|dir| cx.files().resolve(dir));
        cx.compiler()
            .compile_ts(&cx.files().resolve(&ts.project), out_dir.as_deref())
            .await
    }

    fn destination(&self, cx: &StageContext, file: &Path) -> PathBuf {
        let rel = cx.files().relative(file);
        let rel = rel.strip_prefix(&self.args.files_base).unwrap_or(&rel);
        self.args.out_dir.join(rel)
    }

    async fn files(&self, cx: &StageContext) -> anyhow::Result<()> {
        if self.args.files.is_empty() {
            cx.logger().verbose("No files configured", 1);
            return Ok(());
        }
        let matched = cx.files().glob(&self.args.files).await?;
        for file in &matched {
            let dest = self.destination(cx, file);
            if cx.dry_run() {
                cx.logger().log(
                    &format!("[dry-run] copy {} -> {}", cx.files().relative(file).display(), dest.display()),
                    2,
                );
                continue;
            }
            cx.files().copy(file, &dest).await?;
            cx.logger().debug(&format!("copied {}", dest.display()), 2);
        }
        cx.logger().log(&format!("Copied {} file(s)", matched.len()), 1);
        Ok(())
    }
}

#[async_trait]
impl Stage for CompileStage {
    const KIND: &'static str = "compile";
    const COLOR: &'static str = "magenta";

    type Step = CompileStep;
    type Args = CompileArgs;

    fn steps() -> &'static [CompileStep] {
        &[CompileStep::Scss, CompileStep::Ts, CompileStep::Files]
    }

    fn from_args(args: CompileArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: CompileStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            CompileStep::Scss => self.scss(cx).await,
            CompileStep::Ts => self.ts(cx).await,
            CompileStep::Files => self.files(cx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuildstageError;
    use crate::params::{RunFlags, RunParameters};
    use crate::testing::{assert_ran, TestHarness};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn harness() -> TestHarness {
        let harness = TestHarness::new().with_stage_args(
            "compile",
            json!({
                "scss": [{"input": "src/styles/app.scss", "output": "dist/app.css"}],
                "files": ["src/**/*.html", "src/assets/*"],
            }),
        );
        harness.files.insert("src/styles/app.scss", "body {}");
        harness.files.insert("src/index.html", "<html></html>");
        harness.files.insert("src/assets/logo.svg", "<svg/>");
        harness.files.insert("tsconfig.json", "{}");
        harness
    }

    #[tokio::test]
    async fn test_compile_runs_every_sub_stage() {
        let harness = harness();
        let report = harness.run("compile", RunParameters::new()).await.unwrap();

        assert_ran(&report, &["scss", "ts", "files"]);
        assert_eq!(
            harness.compiler.calls(),
            vec!["scss src/styles/app.scss -> dist/app.css", "ts tsconfig.json"]
        );
        assert_eq!(harness.files.contents("dist/index.html").as_deref(), Some("<html></html>"));
        assert_eq!(harness.files.contents("dist/assets/logo.svg").as_deref(), Some("<svg/>"));
    }

    #[tokio::test]
    async fn test_only_ts() {
        let harness = harness();
        let report = harness
            .run("compile", RunParameters::new().with_only("ts"))
            .await
            .unwrap();

        assert_ran(&report, &["ts"]);
        assert_eq!(harness.compiler.calls(), vec!["ts tsconfig.json"]);
    }

    #[tokio::test]
    async fn test_missing_stylesheet_fails_scss() {
        let harness = TestHarness::new().with_stage_args(
            "compile",
            json!({"scss": [{"input": "src/missing.scss", "output": "dist/x.css"}]}),
        );
        let err = harness.run("compile", RunParameters::new()).await.unwrap_err();

        match err {
            BuildstageError::SubStage { sub_stage, source, .. } => {
                assert_eq!(sub_stage, "scss");
                assert!(source.to_string().contains("src/missing.scss"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_tsconfig_is_skipped() {
        let harness = TestHarness::new();
        harness.run("compile", RunParameters::new()).await.unwrap();
        assert!(harness.compiler.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_copy() {
        let harness = harness();
        let params = RunParameters::new().with_only("files").with_flags(RunFlags {
            dry_run: true,
            ..RunFlags::default()
        });
        harness.run("compile", params).await.unwrap();
        assert!(harness.files.contents("dist/index.html").is_none());
    }

    #[tokio::test]
    async fn test_ts_out_dir_override() {
        let harness = harness();
        let args = json!({"ts": {"project": "tsconfig.json", "out_dir": "lib"}});
        harness
            .run_with_args("compile", RunParameters::new().with_only("ts"), Some(&args))
            .await
            .unwrap();
        assert_eq!(harness.compiler.calls(), vec!["ts tsconfig.json -> lib"]);
    }
}
