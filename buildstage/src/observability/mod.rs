//! Observability utilities.

mod logger;
mod timer;

pub use logger::{MessageKind, Notice, StageLogger};
pub use timer::RunTimer;
