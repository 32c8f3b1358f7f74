//! Stage delegation: one stage running another as a nested run.

mod spawner;
mod stack;

pub use spawner::StageSpawner;
pub use stack::{DelegationStack, DEFAULT_MAX_DEPTH};
