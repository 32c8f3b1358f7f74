//! Resolved run parameters for one invocation.

use super::SubStageSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mode flags carried through every stage of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFlags {
    /// Emit debug-level diagnostics.
    pub debug: bool,
    /// Emit verbose diagnostics (combined with `debug` for the noisiest output).
    pub verbose: bool,
    /// Emit progress lines.
    pub progress: bool,
    /// The run was started as a build.
    pub building: bool,
    /// The run produces a package.
    pub packaging: bool,
    /// The run produces a release.
    pub releasing: bool,
    /// Log commands and writes instead of performing them.
    #[serde(alias = "dryrun")]
    pub dry_run: bool,
    /// The run is the initial run of a watch session.
    pub starting: bool,
}

impl RunFlags {
    /// Mode flags implied by the stage kind a run starts with.
    #[must_use]
    pub fn for_stage_kind(kind: &str) -> Self {
        let mut flags = Self::default();
        match kind {
            "build" => flags.building = true,
            "package" => flags.packaging = true,
            "release" => {
                flags.releasing = true;
                flags.packaging = true;
            }
            _ => {}
        }
        flags
    }

    /// Merges another set of flags into this one (logical or).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            debug: self.debug || other.debug,
            verbose: self.verbose || other.verbose,
            progress: self.progress || other.progress,
            building: self.building || other.building,
            packaging: self.packaging || other.packaging,
            releasing: self.releasing || other.releasing,
            dry_run: self.dry_run || other.dry_run,
            starting: self.starting || other.starting,
        }
    }
}

/// File-watch metadata attached when a run was triggered by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedEvent {
    /// The file-system event (e.g. `change`, `add`).
    pub event: String,
    /// The file that triggered the run.
    pub filename: String,
    /// Name of the watcher that fired, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watcher: Option<String>,
}

impl WatchedEvent {
    /// Creates watch metadata.
    #[must_use]
    pub fn new(event: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            filename: filename.into(),
            watcher: None,
        }
    }

    /// Sets the watcher name.
    #[must_use]
    pub fn with_watcher(mut self, watcher: impl Into<String>) -> Self {
        self.watcher = Some(watcher.into());
        self
    }
}

/// The resolved, read-only parameters of one run.
///
/// Created once per invocation, and once per delegated stage run via
/// [`RunParameters::for_delegation`]; never mutated while a stage runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    /// Restricts execution to these sub-stages; empty means all.
    pub only: SubStageSelection,
    /// Excludes these sub-stages even when matched by `only`.
    pub without: SubStageSelection,
    /// `only-<stage>` overrides applied when delegating into `<stage>`.
    pub stage_only: BTreeMap<String, SubStageSelection>,
    /// `without-<stage>` overrides applied when delegating into `<stage>`.
    pub stage_without: BTreeMap<String, SubStageSelection>,
    /// Offset added to every message depth.
    pub log_base_level: usize,
    /// Mode flags.
    pub flags: RunFlags,
    /// Watch metadata, present when a watcher triggered the run.
    pub watched: Option<WatchedEvent>,
}

impl RunParameters {
    /// Creates empty parameters (run everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `only` selection.
    #[must_use]
    pub fn with_only(mut self, only: impl Into<SubStageSelection>) -> Self {
        self.only = only.into();
        self
    }

    /// Sets the `without` selection.
    #[must_use]
    pub fn with_without(mut self, without: impl Into<SubStageSelection>) -> Self {
        self.without = without.into();
        self
    }

    /// Sets the `only-<stage>` override.
    #[must_use]
    pub fn with_only_for(
        mut self,
        stage: impl Into<String>,
        only: impl Into<SubStageSelection>,
    ) -> Self {
        self.stage_only.insert(stage.into(), only.into());
        self
    }

    /// Sets the `without-<stage>` override.
    #[must_use]
    pub fn with_without_for(
        mut self,
        stage: impl Into<String>,
        without: impl Into<SubStageSelection>,
    ) -> Self {
        self.stage_without.insert(stage.into(), without.into());
        self
    }

    /// Sets the log base level.
    #[must_use]
    pub fn with_log_base_level(mut self, level: usize) -> Self {
        self.log_base_level = level;
        self
    }

    /// Sets the mode flags.
    #[must_use]
    pub fn with_flags(mut self, flags: RunFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attaches watch metadata.
    #[must_use]
    pub fn with_watched(mut self, watched: WatchedEvent) -> Self {
        self.watched = Some(watched);
        self
    }

    /// Applies a raw `only-<stage>` / `without-<stage>` key.
    ///
    /// Returns false when the key has neither prefix.
    pub fn set_stage_override(&mut self, key: &str, selection: SubStageSelection) -> bool {
        if let Some(stage) = key.strip_prefix("only-") {
            self.stage_only.insert(stage.to_string(), selection);
            true
        } else if let Some(stage) = key.strip_prefix("without-") {
            self.stage_without.insert(stage.to_string(), selection);
            true
        } else {
            false
        }
    }

    /// Returns the `only-<stage>` override, if any.
    #[must_use]
    pub fn only_for(&self, stage: &str) -> Option<&SubStageSelection> {
        self.stage_only.get(stage)
    }

    /// Returns the `without-<stage>` override, if any.
    #[must_use]
    pub fn without_for(&self, stage: &str) -> Option<&SubStageSelection> {
        self.stage_without.get(stage)
    }

    /// Derives the parameters of a nested run of `stage`.
    ///
    /// The copy shifts the log depth by `level_offset` and replaces
    /// `only`/`without` with this run's overrides for `stage` (cleared when
    /// no override exists). Everything else, including the per-stage
    /// override maps, is carried over so deeper delegations still see them.
    #[must_use]
    pub fn for_delegation(&self, stage: &str, level_offset: usize) -> Self {
        Self {
            only: self.only_for(stage).cloned().unwrap_or_default(),
            without: self.without_for(stage).cloned().unwrap_or_default(),
            stage_only: self.stage_only.clone(),
            stage_without: self.stage_without.clone(),
            log_base_level: self.log_base_level + level_offset,
            flags: self.flags,
            watched: self.watched.clone(),
        }
    }

    /// Returns true if the run was triggered by a file watcher.
    #[must_use]
    pub fn is_watched(&self) -> bool {
        self.watched.is_some()
    }
}
