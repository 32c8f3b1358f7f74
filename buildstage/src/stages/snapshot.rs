//! `snapshot`: timestamped copies of the build output.

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::StageContext;
use crate::utils::{file_stamp, now_utc, parse_file_stamp};

use super::{Stage, SubStage};

/// Sub-stages of [`SnapshotStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStep {
    /// Copy the source directory into a new snapshot.
    Copy,
    /// Delete the oldest snapshots beyond `keep`.
    Prune,
}

impl SubStage for SnapshotStep {
    fn name(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Prune => "prune",
        }
    }
}

/// Arguments of [`SnapshotStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotArgs {
    /// Directory to snapshot.
    pub source: PathBuf,
    /// Directory holding the snapshots.
    pub dir: PathBuf,
    /// Snapshots to keep; 0 keeps all.
    pub keep: usize,
}

impl Default for SnapshotArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::from("dist"),
            dir: PathBuf::from("snapshots"),
            keep: 5,
        }
    }
}

/// Keeps dated copies of the build output.
#[derive(Debug)]
pub struct SnapshotStage {
    args: SnapshotArgs,
}

/// Snapshot directories under `dir`, oldest first.
async fn snapshots(cx: &StageContext, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !cx.files().is_dir(dir).await {
        return Ok(Vec::new());
    }
    let mut found: Vec<PathBuf> = cx
        .files()
        .list_dir(dir)
        .await?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_file_stamp)
                .is_some()
        })
        .collect();
    found.sort();
    Ok(found)
}

impl SnapshotStage {
    async fn copy(&self, cx: &StageContext) -> anyhow::Result<()> {
        if !cx.files().is_dir(&self.args.source).await {
            bail!("nothing to snapshot: {} does not exist", self.args.source.display());
        }
        let target = self.args.dir.join(file_stamp(&now_utc()));
        if cx.dry_run() {
            cx.logger().log(
                &format!(
                    "[dry-run] copy {} -> {}",
                    self.args.source.display(),
                    target.display()
                ),
                1,
            );
            return Ok(());
        }
        let copied = cx.files().copy_dir(&self.args.source, &target).await?;
        cx.logger()
            .log(&format!("Snapshot {} ({copied} file(s))", target.display()), 1);
        Ok(())
    }

    async fn prune(&self, cx: &StageContext) -> anyhow::Result<()> {
        if self.args.keep == 0 {
            cx.logger().verbose("keep = 0; not pruning", 1);
            return Ok(());
        }
        let existing = snapshots(cx, &self.args.dir).await?;
        let excess = existing.len().saturating_sub(self.args.keep);
        for old in &existing[..excess] {
            let rel = cx.files().relative(old);
            if cx.dry_run() {
                cx.logger()
                    .log(&format!("[dry-run] delete {}", rel.display()), 1);
            } else {
                cx.files().delete(old).await?;
                cx.logger().verbose(&format!("deleted {}", rel.display()), 1);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for SnapshotStage {
    const KIND: &'static str = "snapshot";
    const COLOR: &'static str = "cyan";

    type Step = SnapshotStep;
    type Args = SnapshotArgs;

    fn steps() -> &'static [SnapshotStep] {
        &[SnapshotStep::Copy, SnapshotStep::Prune]
    }

    fn from_args(args: SnapshotArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: SnapshotStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            SnapshotStep::Copy => self.copy(cx).await,
            SnapshotStep::Prune => self.prune(cx).await,
        }
    }
}
