//! Nested stage runs with cycle and depth enforcement.

use crate::context::StageContext;
use crate::core::{StageEvent, StageReport};
use crate::errors::Result;

use super::DEFAULT_MAX_DEPTH;

/// Starts delegated stage runs on behalf of a parent stage.
#[derive(Debug, Clone, Copy)]
pub struct StageSpawner {
    max_depth: u32,
}

impl Default for StageSpawner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl StageSpawner {
    /// Creates a spawner enforcing `max_depth`.
    #[must_use]
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Runs `name` to completion as a child of `parent`.
    ///
    /// The child gets the parent's parameters with the log depth shifted by
    /// `level_offset` and `only`/`without` replaced by the parent's
    /// `only-<name>` / `without-<name>`. A stage disabled in configuration
    /// is a logged no-op and yields `None`.
    ///
    /// # Errors
    ///
    /// Cycle, depth, lookup and argument errors before the child starts;
    /// the child's own error when its run fails.
    pub async fn spawn(
        &self,
        parent: &StageContext,
        name: &str,
        level_offset: usize,
    ) -> Result<Option<StageReport>> {
        let Some(resolution) = parent.config().resolve_stage(name) else {
            parent.logger().verbose(
                &format!("Stage '{name}' is disabled in the configuration; skipping"),
                level_offset,
            );
            parent.emit(StageEvent::disabled(parent.name(), name)).await;
            return Ok(None);
        };

        let stack = parent.stack().enter(name, self.max_depth)?;
        let params = parent.params().for_delegation(name, level_offset);
        parent.logger().debug(
            &format!(
                "Delegating to '{name}' (kind '{}', only: {}, without: {})",
                resolution.kind, params.only, params.without
            ),
            level_offset,
        );

        let child = parent.session().registry().instantiate(
            &resolution,
            parent.session(),
            params,
            stack,
            None,
        )?;
        parent
            .emit(StageEvent::delegated(parent.name(), name, &resolution.kind))
            .await;

        let report = child.run().await?;
        Ok(Some(report))
    }
}
