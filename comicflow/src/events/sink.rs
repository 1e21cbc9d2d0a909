//! Event sink trait and implementations.

use super::EventKind;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Receives run lifecycle events.
///
/// Sinks must not fail the run: errors inside a sink are its own business.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event with its payload.
    async fn emit(&self, kind: EventKind, data: Value);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _kind: EventKind, _data: Value) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, kind: EventKind, data: &Value) {
        // Failures are always surfaced, whatever the configured level.
        let failing = matches!(
            kind,
            EventKind::StageFailed | EventKind::ArtifactMissing | EventKind::PipelineFailed
        );
        if failing {
            warn!(event_type = %kind, event_data = %data, "Event: {}", kind);
            return;
        }
        match self.level {
            Level::DEBUG | Level::TRACE => {
                debug!(event_type = %kind, event_data = %data, "Event: {}", kind);
            }
            _ => {
                info!(event_type = %kind, event_data = %data, "Event: {}", kind);
            }
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, kind: EventKind, data: Value) {
        self.log_event(kind, &data);
    }
}

/// A collecting event sink for testing and embedding.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(EventKind, Value)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(EventKind, Value)> {
        self.events.read().clone()
    }

    /// Returns the kinds of all collected events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.read().iter().map(|(kind, _)| *kind).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the payloads of events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<Value> {
        self.events
            .read()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, data)| data.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, kind: EventKind, data: Value) {
        self.events.write().push((kind, data));
    }
}
