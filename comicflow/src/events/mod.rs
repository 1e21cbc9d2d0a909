//! Run lifecycle events.
//!
//! The orchestrator reports progress through an [`EventSink`]. The binary
//! uses [`LoggingEventSink`]; tests use [`CollectingEventSink`].

mod kind;
mod sink;

pub use kind::EventKind;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
