//! Registry of stage kinds.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{resolve_args, StageResolution};
use crate::context::{RunSession, StageContext};
use crate::delegation::DelegationStack;
use crate::errors::{BuildstageError, Result};
use crate::params::RunParameters;

use super::{
    BuildStage, CompileStage, DocumentStage, PackageStage, ReleaseStage, RunnableStage,
    SnapshotStage, Stage, StageInstance, TestStage,
};

/// Inputs for building one stage instance.
#[derive(Debug)]
pub struct StageSetup {
    /// Requested stage name (may be an alias of the kind).
    pub name: String,
    /// The invocation's session.
    pub session: Arc<RunSession>,
    /// Parameters of this run.
    pub params: RunParameters,
    /// Running stages including this one.
    pub stack: DelegationStack,
    /// Project-configuration argument layer.
    pub project_args: Option<Value>,
    /// Call-site argument layer.
    pub call_site_args: Option<Value>,
}

/// Builds a runnable instance of one stage kind.
pub type StageFactory = fn(StageSetup) -> Result<Box<dyn RunnableStage>>;

/// Static data of a registered kind.
#[derive(Debug, Clone)]
pub struct StageEntry {
    /// Kind name.
    pub kind: &'static str,
    /// Display tag.
    pub color: &'static str,
    /// Declared sub-stages in order.
    pub sub_stages: Vec<&'static str>,
    /// Constructor.
    pub factory: StageFactory,
}

fn build_instance<S: Stage>(setup: StageSetup) -> Result<Box<dyn RunnableStage>> {
    let args: S::Args = resolve_args(
        &setup.name,
        setup.project_args.as_ref(),
        setup.call_site_args.as_ref(),
    )?;
    let cx = StageContext::new(
        setup.name,
        S::KIND,
        S::COLOR,
        setup.params,
        setup.session,
        setup.stack,
    );
    Ok(Box::new(StageInstance::<S>::new(args, cx)?))
}

/// Maps kind names to stage constructors.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    entries: BTreeMap<String, StageEntry>,
}

impl StageRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in stage.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .register::<CompileStage>()
            .register::<BuildStage>()
            .register::<TestStage>()
            .register::<SnapshotStage>()
            .register::<DocumentStage>()
            .register::<PackageStage>()
            .register::<ReleaseStage>()
    }

    /// Registers `S` under its own kind name.
    #[must_use]
    pub fn register<S: Stage>(mut self) -> Self {
        self.entries.insert(
            S::KIND.to_string(),
            StageEntry {
                kind: S::KIND,
                color: S::COLOR,
                sub_stages: S::sub_stage_names(),
                factory: build_instance::<S>,
            },
        );
        self
    }

    /// Returns true if `kind` is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Looks up a kind.
    #[must_use]
    pub fn entry(&self, kind: &str) -> Option<&StageEntry> {
        self.entries.get(kind)
    }

    /// Builds a fresh instance for a resolved stage name.
    ///
    /// # Errors
    ///
    /// [`BuildstageError::UnknownStage`] when the kind is not registered,
    /// [`BuildstageError::InvalidArgs`] when the merged arguments do not fit
    /// the stage's argument type.
    pub fn instantiate(
        &self,
        resolution: &StageResolution,
        session: &Arc<RunSession>,
        params: RunParameters,
        stack: DelegationStack,
        call_site_args: Option<&Value>,
    ) -> Result<Box<dyn RunnableStage>> {
        let entry = self
            .entry(&resolution.kind)
            .ok_or_else(|| BuildstageError::UnknownStage {
                name: resolution.name.clone(),
                kind: resolution.kind.clone(),
            })?;
        (entry.factory)(StageSetup {
            name: resolution.name.clone(),
            session: Arc::clone(session),
            params,
            stack,
            project_args: resolution.args_override.clone(),
            call_site_args: call_site_args.cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_registered() {
        let registry = StageRegistry::with_builtins();
        assert_eq!(
            registry.kinds(),
            vec!["build", "compile", "document", "package", "release", "snapshot", "test"]
        );
    }

    #[test]
    fn test_entry_lists_sub_stages_in_order() {
        let registry = StageRegistry::with_builtins();
        assert_eq!(registry.entry("compile").unwrap().sub_stages, vec!["scss", "ts", "files"]);
        assert_eq!(
            registry.entry("build").unwrap().sub_stages,
            vec!["compile", "replace", "prettify", "minimize", "test", "document"]
        );
        assert_eq!(
            registry.entry("release").unwrap().sub_stages,
            vec!["package", "changelog", "commit", "tag", "publish"]
        );
    }

    #[test]
    fn test_unknown_kind() {
        let registry = StageRegistry::new();
        assert!(!registry.contains("build"));
        assert!(registry.entry("build").is_none());
    }
}
