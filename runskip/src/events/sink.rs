//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

use super::EventKind;

/// Receives audit events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event. Sinks must not fail; errors are logged and dropped.
    async fn emit(&self, kind: EventKind, data: serde_json::Value);
}

/// A sink that discards all events.
///
/// Used when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _kind: EventKind, _data: serde_json::Value) {}
}

/// A sink that logs events through `tracing`.
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
    /// Creates a logging sink at `level`. Anything but `DEBUG` logs at info.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, kind: EventKind, data: serde_json::Value) {
        if self.level == Level::DEBUG {
            debug!(event_type = %kind, event_data = %data, "Event: {}", kind);
        } else {
            info!(event_type = %kind, event_data = %data, "Event: {}", kind);
        }
    }
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(EventKind, serde_json::Value)>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<(EventKind, serde_json::Value)> {
        self.events.read().clone()
    }

    /// Returns the collected event kinds in emission order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.read().iter().map(|(k, _)| *k).collect()
    }

    /// Returns the payloads of events of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<serde_json::Value> {
        self.events
            .read()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, data)| data.clone())
            .collect()
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

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, kind: EventKind, data: serde_json::Value) {
        self.events.write().push((kind, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_noop_and_logging_sinks() {
        NoOpEventSink.emit(EventKind::Final, json!({})).await;
        LoggingEventSink::default().emit(EventKind::Final, json!({"should_skip": true})).await;
        LoggingEventSink::debug().emit(EventKind::Paths, json!(null)).await;
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(EventKind::LedgerLoaded, json!({"entries": 2})).await;
        sink.emit(EventKind::Final, json!({"should_skip": false})).await;
        sink.emit(EventKind::LedgerPersisted, json!({})).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.kinds(),
            vec![EventKind::LedgerLoaded, EventKind::Final, EventKind::LedgerPersisted]
        );
        assert_eq!(sink.of_kind(EventKind::Final), vec![json!({"should_skip": false})]);

        sink.clear();
        assert!(sink.is_empty());
    }
}
