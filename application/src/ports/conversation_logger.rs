//! Port for structured transcript logging.
//!
//! Defines the [`ConversationLogger`] trait for recording interview events
//! (turns, questions, answers, the final PRD, errors) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! interview transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured transcript event for logging.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "turn", "question", "prd_ready").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging transcript events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL
/// line). The `log` method is intentionally synchronous and non-fallible to
/// avoid disrupting the turn protocol; logging failures are silently
/// ignored.
pub trait ConversationLogger: Send + Sync {
    /// Record a transcript event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
