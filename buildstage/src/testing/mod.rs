//! Testing utilities for buildstage stages.
//!
//! This module provides:
//! - In-memory and recording fakes for every port
//! - `ScriptedStage`, a stage driven by its arguments
//! - A harness wiring fakes, configuration and registry together
//! - Assertions for reports and events

mod assertions;
mod fakes;
mod harness;
mod scripted;

pub use crate::events::CollectingEventSink;
pub use assertions::{assert_event_count, assert_finished, assert_ran, assert_skipped};
pub use fakes::{
    HandledCall, MemoryFileAccess, RecordingCommandRunner, RecordingCompiler,
    RecordingErrorHandler, RecordingPublisher,
};
pub use harness::{TestHarness, HARNESS_ROOT};
pub use scripted::{ScriptedArgs, ScriptedStage, ScriptedStep, SCRIPTED_STEP_EVENT};
