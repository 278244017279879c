//! Interview phases and session status

use serde::{Deserialize, Serialize};

/// Persisted phase of the interview.
///
/// Phases are strictly ordered (`Exploring < Questioning < Generating`)
/// and only ever advance forward. The terminal outcomes (complete, failed,
/// cancelled) are runtime-only and live in [`SessionStatus`]; a state file
/// for a finished interview does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    /// Open-ended discussion of the feature
    Exploring,
    /// Structured question/answer rounds
    Questioning,
    /// The assistant is producing the PRD
    Generating,
}

impl InterviewPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewPhase::Exploring => "exploring",
            InterviewPhase::Questioning => "questioning",
            InterviewPhase::Generating => "generating",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            InterviewPhase::Exploring => "Exploring",
            InterviewPhase::Questioning => "Questioning",
            InterviewPhase::Generating => "Generating",
        }
    }

    /// Position in the forward-only ordering.
    pub fn rank(&self) -> u8 {
        match self {
            InterviewPhase::Exploring => 0,
            InterviewPhase::Questioning => 1,
            InterviewPhase::Generating => 2,
        }
    }

    /// Whether a transition to `next` respects the forward-only ordering.
    /// Staying in place is allowed (questioning loops on itself).
    pub fn can_advance_to(&self, next: InterviewPhase) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Runtime status of an orchestrated session.
///
/// `Init → Exploring → Questioning → Generating → Complete`, with `Failed`
/// and `Cancelled` reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Constructed, provider not yet spawned
    Init,
    Exploring,
    Questioning,
    Generating,
    /// PRD produced and validated
    Complete,
    /// Non-recoverable error after checkpointing
    Failed,
    /// Explicit user cancellation; terminal, no retry
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Init => "init",
            SessionStatus::Exploring => "exploring",
            SessionStatus::Questioning => "questioning",
            SessionStatus::Generating => "generating",
            SessionStatus::Complete => "complete",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Complete | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    /// The session status a persisted phase resumes into.
    pub fn from_phase(phase: InterviewPhase) -> Self {
        match phase {
            InterviewPhase::Exploring => SessionStatus::Exploring,
            InterviewPhase::Questioning => SessionStatus::Questioning,
            InterviewPhase::Generating => SessionStatus::Generating,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
