//! Execution context for stages.
//!
//! This module provides:
//! - [`RunSession`]: configuration, ports, registry and failure record
//!   shared by one invocation
//! - [`StageContext`]: what a sub-stage body sees, including stage
//!   delegation, failure isolation and command execution

mod isolation;
mod session;
mod stage;


pub use session::RunSession;
pub use stage::StageContext;
