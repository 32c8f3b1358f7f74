//! The stage run loop.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use serde_json::Value;

use crate::context::StageContext;
use crate::core::{StageEvent, StageReport, StageStatus, SubStageOutcome};
use crate::errors::{BuildstageError, Result};
use crate::observability::{Notice, RunTimer};
use crate::params::RunParameters;

use super::inclusion::InclusionDecision;
use super::notices::start_end_notice;
use super::{Stage, SubStage};

/// Object-safe view of a stage instance.
#[async_trait]
pub trait RunnableStage: Send + Sync {
    /// Stage name as requested.
    fn name(&self) -> &str;

    /// Registered kind.
    fn kind(&self) -> &'static str;

    /// Display tag.
    fn color(&self) -> &'static str;

    /// Declared sub-stages in order.
    fn sub_stage_names(&self) -> Vec<&'static str>;

    /// Current lifecycle state.
    fn status(&self) -> StageStatus;

    /// The run's parameters.
    fn params(&self) -> &RunParameters;

    /// Fully merged arguments.
    fn args(&self) -> &Value;

    /// The inclusion decision for one sub-stage, logged at debug levels.
    fn is_sub_stage_included(&self, name: &str, level: usize) -> bool;

    /// Runs every included sub-stage in declared order.
    ///
    /// # Errors
    ///
    /// The first unrecovered sub-stage error; later sub-stages never run.
    /// Calling `run` twice is [`BuildstageError::InvalidState`].
    ///
    /// # Panics
    ///
    /// A panic outside failure isolation marks the stage failed and is
    /// then resumed.
    async fn run(&self) -> Result<StageReport>;
}

/// One instantiation of a stage kind.
pub struct StageInstance<S: Stage> {
    stage: S,
    args: Value,
    cx: StageContext,
    status: Mutex<StageStatus>,
}

impl<S: Stage> std::fmt::Debug for StageInstance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageInstance")
            .field("name", &self.cx.name())
            .field("kind", &S::KIND)
            .field("status", &*self.status.lock())
            .finish_non_exhaustive()
    }
}

impl<S: Stage> StageInstance<S> {
    /// Builds the instance from merged arguments and its context.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::Serialization`] if the arguments cannot be
    /// represented as JSON.
    pub fn new(args: S::Args, cx: StageContext) -> Result<Self> {
        let json = serde_json::to_value(&args)?;
        cx.logger()
            .debug_verbose(&format!("Resolved arguments: {json}"), 0);
        Ok(Self {
            stage: S::from_args(args),
            args: json,
            cx,
            status: Mutex::new(StageStatus::NotStarted),
        })
    }

    /// The stage's context.
    #[must_use]
    pub fn context(&self) -> &StageContext {
        &self.cx
    }

    fn transition(&self, next: StageStatus) -> Result<()> {
        let mut status = self.status.lock();
        if !status.can_transition_to(next) {
            return Err(BuildstageError::InvalidState {
                stage: self.cx.name().to_string(),
                state: status.to_string(),
            });
        }
        *status = next;
        Ok(())
    }

    fn decide(&self, name: &str) -> InclusionDecision {
        let declared = S::sub_stage_names();
        InclusionDecision::evaluate(name, &declared, &self.cx.params().only, &self.cx.params().without)
    }

    async fn fail(&self, step: &str, err: anyhow::Error) -> BuildstageError {
        *self.status.lock() = StageStatus::Failed;
        let err = stage_error(self.cx.name(), step, err);
        self.cx
            .emit(StageEvent::failed(self.cx.name(), step, &err.to_string()))
            .await;
        err
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}

/// Errors that already describe the whole run pass through unchanged;
/// anything else is attributed to the sub-stage.
fn stage_error(stage: &str, step: &str, err: anyhow::Error) -> BuildstageError {
    let passes_through = matches!(
        err.downcast_ref::<BuildstageError>(),
        Some(
            BuildstageError::Fatal { .. }
                | BuildstageError::SubStage { .. }
                | BuildstageError::DelegationCycle { .. }
                | BuildstageError::DelegationDepth { .. }
                | BuildstageError::UnknownStage { .. }
                | BuildstageError::InvalidArgs { .. }
                | BuildstageError::InvalidState { .. }
        )
    );
    if passes_through {
        match err.downcast::<BuildstageError>() {
            Ok(inner) => inner,
            Err(err) => BuildstageError::sub_stage(stage, step, err),
        }
    } else {
        BuildstageError::sub_stage(stage, step, err)
    }
}

#[async_trait]
impl<S: Stage> RunnableStage for StageInstance<S> {
    fn name(&self) -> &str {
        self.cx.name()
    }

    fn kind(&self) -> &'static str {
        S::KIND
    }

    fn color(&self) -> &'static str {
        S::COLOR
    }

    fn sub_stage_names(&self) -> Vec<&'static str> {
        S::sub_stage_names()
    }

    fn status(&self) -> StageStatus {
        *self.status.lock()
    }

    fn params(&self) -> &RunParameters {
        self.cx.params()
    }

    fn args(&self) -> &Value {
        &self.args
    }

    fn is_sub_stage_included(&self, name: &str, level: usize) -> bool {
        let decision = self.decide(name);
        let logger = self.cx.logger();
        logger.debug(&format!("{name}: {}", decision.reason()), level);
        logger.debug_verbose(
            &format!(
                "{name}: handler_exists={} include={} exclude={} (only: {}, without: {})",
                decision.handler_exists,
                decision.include,
                decision.exclude,
                self.cx.params().only,
                self.cx.params().without
            ),
            level,
        );
        decision.included()
    }

    async fn run(&self) -> Result<StageReport> {
        self.transition(StageStatus::Running)?;
        let timer = RunTimer::stage(self.cx.name());
        let mut report = StageReport::begin(self.cx.name(), S::KIND);
        let depth = self.cx.logger().depth(0);

        self.cx.emit(StageEvent::started(self.cx.name(), depth)).await;
        start_end_notice(&self.cx, Notice::Start, self.cx.is_top_level()).await;

        for &step in S::steps() {
            let name = step.name();
            if !self.is_sub_stage_included(name, 1) {
                report.record(name, SubStageOutcome::Skipped);
                self.cx
                    .emit(StageEvent::sub_stage_skipped(self.cx.name(), name))
                    .await;
                continue;
            }

            self.cx.logger().progress(&format!("{name}..."), 1);
            let step_timer = RunTimer::sub_stage(self.cx.name(), name);
            let outcome = AssertUnwindSafe(self.stage.run_sub_stage(step, &self.cx))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(self.fail(name, err).await),
                // Record the failure, then keep unwinding.
                Err(payload) => {
                    let err = anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref()));
                    self.fail(name, err).await;
                    std::panic::resume_unwind(payload);
                }
            }
            report.record(name, SubStageOutcome::Ran);
            self.cx
                .emit(StageEvent::sub_stage_completed(
                    self.cx.name(),
                    name,
                    step_timer.finish(),
                ))
                .await;
        }

        start_end_notice(&self.cx, Notice::End, self.cx.is_top_level()).await;
        self.transition(StageStatus::Finished)?;
        self.cx
            .emit(StageEvent::completed(self.cx.name(), timer.finish()))
            .await;
        Ok(report.finish(StageStatus::Finished))
    }
}
