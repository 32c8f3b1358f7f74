//! `document`: API documentation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::StageContext;
use crate::ports::CommandSpec;

use super::{Stage, SubStage};

/// Sub-stages of [`DocumentStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStep {
    /// Run the documentation generator.
    Generate,
}

impl SubStage for DocumentStep {
    fn name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
        }
    }
}

/// Arguments of [`DocumentStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentArgs {
    /// Entry points passed to the generator.
    pub entry: Vec<String>,
    /// Output directory.
    pub out_dir: PathBuf,
    /// Extra generator arguments.
    pub extra_args: Vec<String>,
}

impl Default for DocumentArgs {
    fn default() -> Self {
        Self {
            entry: vec!["src/index.ts".to_string()],
            out_dir: PathBuf::from("docs"),
            extra_args: Vec::new(),
        }
    }
}

/// Generates documentation.
#[derive(Debug)]
pub struct DocumentStage {
    args: DocumentArgs,
}

impl DocumentStage {
    fn command(&self, cx: &StageContext) -> CommandSpec {
        CommandSpec::new(&cx.config().tools.typedoc)
            .arg("--out")
            .arg(self.args.out_dir.to_string_lossy())
            .args(self.args.extra_args.iter().cloned())
            .args(self.args.entry.iter().cloned())
    }
}

#[async_trait]
impl Stage for DocumentStage {
    const KIND: &'static str = "document";
    const COLOR: &'static str = "green";

    type Step = DocumentStep;
    type Args = DocumentArgs;

    fn steps() -> &'static [DocumentStep] {
        &[DocumentStep::Generate]
    }

    fn from_args(args: DocumentArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: DocumentStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            DocumentStep::Generate => {
                cx.exec(&self.command(cx), 1).await?;
                cx.logger()
                    .log(&format!("Documentation in {}", self.args.out_dir.display()), 1);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::params::RunParameters;
    use crate::testing::TestHarness;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_typedoc_invocation() {
        let harness = TestHarness::new();
        harness.run("document", RunParameters::new()).await.unwrap();
        assert_eq!(
            harness.commands.displays(),
            vec!["typedoc --out docs src/index.ts"]
        );
    }

    #[tokio::test]
    async fn test_configured_invocation() {
        let harness = TestHarness::new()
            .with_config(|c| c.tools.typedoc = "node_modules/.bin/typedoc".into())
            .with_stage_args(
                "document",
                json!({"entry": ["src/a.ts", "src/b.ts"], "out_dir": "site/api", "extra_args": ["--readme", "none"]}),
            );
        harness.run("document", RunParameters::new()).await.unwrap();
        assert_eq!(
            harness.commands.displays(),
            vec!["node_modules/.bin/typedoc --out site/api --readme none src/a.ts src/b.ts"]
        );
    }
}
