//! A stage whose behaviour is driven entirely by its arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::context::StageContext;
use crate::core::StageEvent;
use crate::recovery::TryOptions;
use crate::stages::{Stage, SubStage};

/// Event emitted by every scripted sub-stage body before anything else.
pub const SCRIPTED_STEP_EVENT: &str = "scripted.step";

/// Sub-stages of [`ScriptedStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedStep {
    /// First.
    A,
    /// Second.
    B,
    /// Third.
    C,
}

impl SubStage for ScriptedStep {
    fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
        }
    }
}

/// Arguments of [`ScriptedStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedArgs {
    /// Sub-stage whose body returns an error.
    pub fail_on: Option<String>,
    /// Sub-stage whose body panics.
    pub panic_on: Option<String>,
    /// When set, bodies run inside `atry` with this `exit_process`.
    pub try_exit_process: Option<bool>,
    /// Sub-stage name to the stage it delegates to.
    pub delegate: BTreeMap<String, String>,
    /// Log level offset passed when delegating.
    pub level_offset: usize,
}

/// Test stage with sub-stages `a`, `b` and `c`.
///
/// Each body emits [`SCRIPTED_STEP_EVENT`], delegates when configured, and
/// then fails or panics when its name matches `fail_on` / `panic_on`.
#[derive(Debug)]
pub struct ScriptedStage {
    args: ScriptedArgs,
}

impl ScriptedStage {
    async fn body(&self, name: &str, cx: &StageContext) -> anyhow::Result<()> {
        if let Some(target) = self.args.delegate.get(name) {
            cx.run_stage(target, self.args.level_offset).await?;
        }
        if self.args.panic_on.as_deref() == Some(name) {
            panic!("{name} panicked");
        }
        if self.args.fail_on.as_deref() == Some(name) {
            anyhow::bail!("{name} failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    const KIND: &'static str = "scripted";
    const COLOR: &'static str = "white";

    type Step = ScriptedStep;
    type Args = ScriptedArgs;

    fn steps() -> &'static [ScriptedStep] {
        &[ScriptedStep::A, ScriptedStep::B, ScriptedStep::C]
    }

    fn from_args(args: ScriptedArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: ScriptedStep, cx: &StageContext) -> anyhow::Result<()> {
        let name = step.name();
        cx.emit(
            StageEvent::custom(cx.name(), SCRIPTED_STEP_EVENT).add_data("sub_stage", json!(name)),
        )
        .await;

        match self.args.try_exit_process {
            Some(exit_process) => {
                let options = TryOptions::fatal().with_exit_process(exit_process);
                cx.atry(self.body(name, cx), 1, options).await?;
                Ok(())
            }
            None => self.body(name, cx).await,
        }
    }
}
