//! Event sink adapters.
//!
//! `TracingEventSink` forwards batch events into the host's `tracing`
//! subscriber. `MemoryEventSink` captures them for inspection in tests.

use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, warn};

use stencil_core::application::{
    event::{BatchEvent, EventLevel},
    ports::EventSink,
};

/// Forwards every batch event to `tracing` at the matching level.
///
/// The event's batch id, operation sequence and JSON context become
/// structured fields, so whatever subscriber the host installs sees the
/// full picture.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: BatchEvent) {
        let batch = event.batch_id;
        let operation = event.operation_id;
        let context = &event.context;
        match event.level {
            EventLevel::Debug => {
                debug!(%batch, ?operation, %context, "{}", event.message);
            }
            EventLevel::Info => {
                info!(%batch, ?operation, %context, "{}", event.message);
            }
            EventLevel::Warn => {
                warn!(%batch, ?operation, %context, "{}", event.message);
            }
            EventLevel::Error => {
                error!(%batch, ?operation, %context, "{}", event.message);
            }
        }
    }
}

/// Collects events in memory, for asserting on a batch's trail in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<RwLock<Vec<BatchEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages only, in emission order.
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.message)
            .collect()
    }

    /// Events at one level, in emission order.
    pub fn at_level(&self, level: EventLevel) -> Vec<BatchEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: BatchEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_core::domain::BatchId;

    #[test]
    fn memory_sink_keeps_emission_order() {
        let sink = MemoryEventSink::new();
        let batch = BatchId::new();
        sink.emit(BatchEvent::info(batch, "first"));
        sink.emit(BatchEvent::warn(batch, "second"));

        assert_eq!(sink.messages(), vec!["first", "second"]);
        assert_eq!(sink.at_level(EventLevel::Warn).len(), 1);
    }

    #[test]
    fn clones_share_the_same_buffer() {
        let sink = MemoryEventSink::new();
        let clone = sink.clone();
        clone.emit(BatchEvent::debug(BatchId::new(), "seen by both"));

        assert_eq!(sink.events().len(), 1);
    }
}
