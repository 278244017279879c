//! Interview events emitted by the orchestrator for presentation rendering
//!
//! These events form the output port from the application layer to the
//! presentation layer. Handlers are called synchronously, in-line during
//! the turn call, so a renderer observes progress without polling.

use prdgen_domain::{ErrorCategory, InterviewPhase, StructuredQuestion};

/// Events emitted during an interview session
#[derive(Debug, Clone)]
pub enum InterviewEvent {
    /// The interview phase advanced.
    PhaseChanged {
        from: InterviewPhase,
        to: InterviewPhase,
    },
    /// The assistant posed a structured question.
    QuestionReceived(StructuredQuestion),
    /// A user answer was appended to history.
    AnswerRecorded {
        question: Option<String>,
        answer: String,
    },
    /// A valid PRD payload was produced; the session is complete.
    PrdReady,
    /// An error is about to surface to the caller. `message` is the fixed
    /// per-category user-facing text; raw causes go to the log only.
    Error {
        category: ErrorCategory,
        message: String,
    },
}

/// Sink for interview events.
///
/// Handlers are synchronous and non-fallible: a misbehaving renderer must
/// not be able to disrupt the turn protocol.
pub trait InterviewEventSink: Send + Sync {
    fn on_event(&self, event: &InterviewEvent);
}

/// No-op sink for tests and headless runs.
pub struct NoEventSink;

impl InterviewEventSink for NoEventSink {
    fn on_event(&self, _event: &InterviewEvent) {}
}
