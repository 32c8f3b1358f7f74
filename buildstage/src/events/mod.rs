//! Event sinks for engine lifecycle events.
//!
//! Every stage context carries an [`EventSink`]; the engine reports starts,
//! skips, completions, delegations and recovered failures through it.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
