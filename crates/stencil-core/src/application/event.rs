//! Batch events emitted through the `EventSink` port.
//!
//! Every state transition of a batch (validated, backed up, written,
//! recorded, rolled back) produces one `BatchEvent`. Sinks decide what to do
//! with them; the services never format log lines themselves.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::application::ports::EventSink;
use crate::domain::BatchId;

/// Severity of a batch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured event from a batch run.
///
/// `operation_id` is the ledger sequence of the operation the event belongs
/// to, when it belongs to one. `context` carries event-specific fields
/// (paths, digests, counts) as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub batch_id: BatchId,
    pub operation_id: Option<u64>,
    pub message: String,
    pub context: Value,
}

impl BatchEvent {
    fn new(level: EventLevel, batch_id: BatchId, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            batch_id,
            operation_id: None,
            message: message.into(),
            context: Value::Null,
        }
    }

    pub fn debug(batch_id: BatchId, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Debug, batch_id, message)
    }

    pub fn info(batch_id: BatchId, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, batch_id, message)
    }

    pub fn warn(batch_id: BatchId, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warn, batch_id, message)
    }

    pub fn error(batch_id: BatchId, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, batch_id, message)
    }

    pub fn with_operation(mut self, sequence: u64) -> Self {
        self.operation_id = Some(sequence);
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Sink that drops every event, for hosts that opt out of batch logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: BatchEvent) {}
}
