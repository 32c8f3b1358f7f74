//! Run parameters threaded through every stage.
//!
//! This module provides:
//! - `only`/`without` sub-stage selections in single-name and list form
//! - Mode flags and file-watch metadata
//! - Derivation of nested-run parameters for stage delegation

mod run;
mod selection;

pub use run::{RunFlags, RunParameters, WatchedEvent};
pub use selection::SubStageSelection;
