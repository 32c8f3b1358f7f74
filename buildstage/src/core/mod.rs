//! Core domain types for buildstage.
//!
//! This module contains:
//! - Stage lifecycle and sub-stage outcome enums
//! - Run reports
//! - Lifecycle events

mod event;
mod report;
mod status;

pub use event::StageEvent;
pub use report::{StageReport, SubStageReport};
pub use status::{StageStatus, SubStageOutcome};
