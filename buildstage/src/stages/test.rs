//! `test`: runs the project's test command.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::StageContext;
use crate::ports::CommandSpec;

use super::{Stage, SubStage};

/// Sub-stages of [`TestStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStep {
    /// Run the test command.
    Run,
}

impl SubStage for TestStep {
    fn name(self) -> &'static str {
        match self {
            Self::Run => "run",
        }
    }
}

/// Arguments of [`TestStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestArgs {
    /// Overrides `[tools].test`.
    pub command: Option<Vec<String>>,
    /// Extra environment for the command.
    pub env: BTreeMap<String, String>,
}

/// Runs the test suite.
#[derive(Debug)]
pub struct TestStage {
    args: TestArgs,
}

impl TestStage {
    fn command(&self, cx: &StageContext) -> anyhow::Result<CommandSpec> {
        let argv = self.args.command.as_ref().unwrap_or(&cx.config().tools.test);
        let mut cmd = CommandSpec::from_argv(argv).ok_or_else(|| anyhow!("the test command is empty"))?;
        for (key, value) in &self.args.env {
            cmd = cmd.env(key, value);
        }
        Ok(cmd)
    }
}

#[async_trait]
impl Stage for TestStage {
    const KIND: &'static str = "test";
    const COLOR: &'static str = "yellow";

    type Step = TestStep;
    type Args = TestArgs;

    fn steps() -> &'static [TestStep] {
        &[TestStep::Run]
    }

    fn from_args(args: TestArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: TestStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            TestStep::Run => {
                let cmd = self.command(cx)?;
                cx.logger().log(&cmd.display(), 1);
                let output = cx.exec(&cmd, 1).await?;
                for line in output.stdout.lines() {
                    cx.logger().verbose(line, 2);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BuildstageError;
    use crate::params::{RunFlags, RunParameters};
    use crate::testing::TestHarness;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_runs_configured_command() {
        let harness = TestHarness::new().with_config(|c| {
            c.tools.test = vec!["npx".into(), "jest".into(), "--ci".into()];
        });
        harness.run("test", RunParameters::new()).await.unwrap();
        assert_eq!(harness.commands.displays(), vec!["npx jest --ci"]);
    }

    #[tokio::test]
    async fn test_args_override_and_env() {
        let harness = TestHarness::new()
            .with_stage_args("test", json!({"command": ["cargo", "test"], "env": {"CI": "1"}}));
        harness.run("test", RunParameters::new()).await.unwrap();

        let commands = harness.commands.commands();
        assert_eq!(commands[0].display(), "cargo test");
        assert_eq!(commands[0].env.get("CI").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let harness = TestHarness::new().with_stage_args("test", json!({"command": []}));
        let err = harness.run("test", RunParameters::new()).await.unwrap_err();
        assert!(err.to_string().contains("the test command is empty"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_command() {
        let harness = TestHarness::new();
        let params = RunParameters::new().with_flags(RunFlags {
            dry_run: true,
            ..RunFlags::default()
        });
        harness.run("test", params).await.unwrap();
        assert!(harness.commands.commands().is_empty());
    }

    #[tokio::test]
    async fn test_failing_command_is_a_sub_stage_error() {
        let harness = TestHarness::new();
        harness.commands.fail_on("npm");
        let err = harness.run("test", RunParameters::new()).await.unwrap_err();
        assert!(matches!(err, BuildstageError::SubStage { ref sub_stage, .. } if sub_stage == "run"));
    }
}
