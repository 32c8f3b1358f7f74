//! Stage trait and implementations.
//!
//! A stage is a fixed, ordered list of sub-stages plus a body for each.
//! Sub-stages are a per-stage enum, so "every declared name has a body" is
//! checked by the compiler through the exhaustive `match` in
//! [`Stage::run_sub_stage`].

mod build;
mod compile;
mod document;
mod engine;
#[cfg(test)]
mod engine_tests;
mod inclusion;
#[cfg(test)]
mod integration_tests;
mod notices;
mod package;
mod project_info;
mod registry;
mod release;
mod snapshot;
mod test;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::context::StageContext;

pub use build::{BuildArgs, BuildStage, BuildStep, Replacement};
pub use compile::{CompileArgs, CompileStage, CompileStep, ScssEntry, TsProject};
pub use document::{DocumentArgs, DocumentStage, DocumentStep};
pub use engine::{RunnableStage, StageInstance};
pub use inclusion::{is_included, InclusionDecision};
pub use notices::{notice_text, start_end_notice};
pub use package::{checksum_line, PackageArgs, PackageStage, PackageStep};
pub use project_info::ProjectInfo;
pub use registry::{StageEntry, StageFactory, StageRegistry, StageSetup};
pub use release::{prepend_entry, ReleaseArgs, ReleaseStage, ReleaseStep};
pub use snapshot::{SnapshotArgs, SnapshotStage, SnapshotStep};
pub use test::{TestArgs, TestStage, TestStep};

/// A named step of a stage.
pub trait SubStage: Copy + Eq + Debug + Send + Sync + 'static {
    /// The name used by `only` / `without` and in logs.
    fn name(self) -> &'static str;
}

/// A stage kind.
///
/// Implementations hold their resolved, immutable arguments and provide one
/// body per declared sub-stage. The engine ([`StageInstance`]) owns the run
/// loop; a stage never drives its own sub-stages.
#[async_trait]
pub trait Stage: Send + Sync + Sized + 'static {
    /// Registered kind name.
    const KIND: &'static str;
    /// Display tag used in log output.
    const COLOR: &'static str;

    /// The stage's sub-stages.
    type Step: SubStage;
    /// Typed arguments; `Default` is the built-in default layer.
    type Args: Serialize + DeserializeOwned + Default + Debug + Send + Sync;

    /// Sub-stages in execution order.
    fn steps() -> &'static [Self::Step];

    /// Builds the stage from fully merged arguments.
    fn from_args(args: Self::Args) -> Self;

    /// Runs one sub-stage body.
    async fn run_sub_stage(&self, step: Self::Step, cx: &StageContext) -> anyhow::Result<()>;

    /// Declared sub-stage names in order.
    #[must_use]
    fn sub_stage_names() -> Vec<&'static str> {
        Self::steps().iter().map(|s| s.name()).collect()
    }

    /// Looks up a declared sub-stage by name.
    #[must_use]
    fn find_step(name: &str) -> Option<Self::Step> {
        Self::steps().iter().copied().find(|s| s.name() == name)
    }
}
