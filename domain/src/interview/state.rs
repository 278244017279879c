//! Interview state entity
//!
//! [`InterviewState`] is the persisted, versioned record of conversation
//! progress. It is pure data plus validation; how the bytes reach disk is
//! the state-store adapter's business. The on-disk document has exactly one
//! writer (the orchestrator) and is not hand-editable; external edits are
//! undefined behavior.

use crate::core::feature::Feature;
use crate::core::provider::ProviderKind;
use crate::interview::phase::InterviewPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current schema version. Loaders reject any other value; there is no
/// migration path.
pub const STATE_VERSION: u32 = 1;

/// One completed question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The question the assistant asked, if this turn answered one.
    pub question: Option<String>,
    /// The user's answer (or opening message).
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Identifies a specific problem in a loaded state document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateIssue {
    /// The field the problem was found in.
    pub field: &'static str,
    pub message: String,
}

impl StateIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StateIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The persisted record of interview progress (Entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewState {
    pub version: u32,
    pub feature: Feature,
    pub provider: ProviderKind,
    pub first_principles: bool,
    #[serde(default)]
    pub context_files: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phase: InterviewPhase,
    /// Append-only record of completed exchanges.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Free-form notes the assistant accumulates across turns; re-sent to
    /// the provider on resume because the CLIs keep no cross-process memory.
    #[serde(default)]
    pub ai_context: String,
}

impl InterviewState {
    /// Create a fresh state for a new interview.
    pub fn new(feature: Feature, provider: ProviderKind, first_principles: bool) -> Self {
        let now = Utc::now();
        Self {
            version: STATE_VERSION,
            feature,
            provider,
            first_principles,
            context_files: Vec::new(),
            started_at: now,
            updated_at: now,
            phase: InterviewPhase::Exploring,
            history: Vec::new(),
            ai_context: String::new(),
        }
    }

    pub fn with_context_files(mut self, files: Vec<PathBuf>) -> Self {
        self.context_files = files;
        self
    }

    /// Append a completed exchange and refresh `updated_at`.
    ///
    /// The entry's timestamp is clamped to never run backwards relative to
    /// the last recorded entry.
    pub fn record_turn(&mut self, question: Option<String>, answer: impl Into<String>) {
        let now = Utc::now();
        let timestamp = match self.history.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        self.history.push(HistoryEntry {
            question,
            answer: answer.into(),
            timestamp,
        });
        self.updated_at = timestamp;
    }

    /// Advance the phase. Forward-only: a regression is rejected.
    pub fn advance_phase(&mut self, next: InterviewPhase) -> Result<(), StateIssue> {
        if !self.phase.can_advance_to(next) {
            return Err(StateIssue::new(
                "phase",
                format!("cannot move from {} back to {}", self.phase, next),
            ));
        }
        if self.phase != next {
            self.phase = next;
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Merge assistant notes accumulated during a turn.
    pub fn append_ai_context(&mut self, notes: &str) {
        let notes = notes.trim();
        if notes.is_empty() {
            return;
        }
        if !self.ai_context.is_empty() {
            self.ai_context.push_str("\n\n");
        }
        self.ai_context.push_str(notes);
    }

    /// Refresh `updated_at` to now (used around checkpoints).
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Validate a state document, returning one issue per malformed field.
    ///
    /// Constructor-produced states always validate clean; this exists to
    /// vet externally supplied (loaded) documents.
    pub fn validate(&self) -> Vec<StateIssue> {
        let mut issues = Vec::new();

        if self.version != STATE_VERSION {
            issues.push(StateIssue::new(
                "version",
                format!("expected {}, found {}", STATE_VERSION, self.version),
            ));
        }

        if self.feature.description().trim().is_empty() {
            issues.push(StateIssue::new("feature", "feature description is empty"));
        }

        if self.updated_at < self.started_at {
            issues.push(StateIssue::new(
                "updated_at",
                "updated_at precedes started_at",
            ));
        }

        let ordered = self
            .history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp);
        if !ordered {
            issues.push(StateIssue::new(
                "history",
                "history timestamps are not non-decreasing",
            ));
        }

        if self
            .history
            .iter()
            .any(|entry| entry.answer.trim().is_empty())
        {
            issues.push(StateIssue::new(
                "history",
                "history contains an empty answer",
            ));
        }

        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fresh_state() -> InterviewState {
        InterviewState::new(
            Feature::new("add user authentication"),
            ProviderKind::Claude,
            false,
        )
    }

    #[test]
    fn constructor_state_validates_clean() {
        assert!(fresh_state().is_valid());
    }

    #[test]
    fn new_state_starts_exploring_with_empty_history() {
        let state = fresh_state();
        assert_eq!(state.phase, InterviewPhase::Exploring);
        assert!(state.history.is_empty());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn record_turn_appends_and_touches() {
        let mut state = fresh_state();
        state.record_turn(Some("Who are the users?".to_string()), "Internal staff");
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].answer, "Internal staff");
        assert!(state.updated_at >= state.started_at);
    }

    #[test]
    fn phase_cannot_regress() {
        let mut state = fresh_state();
        state.advance_phase(InterviewPhase::Questioning).unwrap();
        state.advance_phase(InterviewPhase::Generating).unwrap();
        assert!(state.advance_phase(InterviewPhase::Questioning).is_err());
        assert_eq!(state.phase, InterviewPhase::Generating);
    }

    #[test]
    fn phase_can_stay_in_place() {
        let mut state = fresh_state();
        state.advance_phase(InterviewPhase::Questioning).unwrap();
        assert!(state.advance_phase(InterviewPhase::Questioning).is_ok());
    }

    #[test]
    fn version_mismatch_is_an_issue() {
        let mut state = fresh_state();
        state.version = 2;
        let issues = state.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "version");
    }

    #[test]
    fn one_issue_per_malformed_field() {
        let mut state = fresh_state();
        state.version = 99;
        state.updated_at = state.started_at - Duration::seconds(30);
        state.history.push(HistoryEntry {
            question: None,
            answer: "  ".to_string(),
            timestamp: Utc::now(),
        });
        let issues = state.validate();
        let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
        assert!(fields.contains(&"version"));
        assert!(fields.contains(&"updated_at"));
        assert!(fields.contains(&"history"));
    }

    #[test]
    fn out_of_order_history_detected() {
        let mut state = fresh_state();
        let now = Utc::now();
        state.history.push(HistoryEntry {
            question: None,
            answer: "first".to_string(),
            timestamp: now,
        });
        state.history.push(HistoryEntry {
            question: None,
            answer: "second".to_string(),
            timestamp: now - Duration::seconds(10),
        });
        assert!(state
            .validate()
            .iter()
            .any(|i| i.field == "history" && i.message.contains("non-decreasing")));
    }

    #[test]
    fn append_ai_context_separates_blocks() {
        let mut state = fresh_state();
        state.append_ai_context("Users are internal staff.");
        state.append_ai_context("  ");
        state.append_ai_context("Auth must support SSO.");
        assert_eq!(
            state.ai_context,
            "Users are internal staff.\n\nAuth must support SSO."
        );
    }

    #[test]
    fn serde_roundtrip_preserves_state() {
        let mut state = fresh_state();
        state.record_turn(Some("Q1".to_string()), "A1");
        state.advance_phase(InterviewPhase::Questioning).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: InterviewState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.history, state.history);
        assert_eq!(back.phase, state.phase);
        assert_eq!(back.feature, state.feature);
        assert_eq!(back.updated_at, state.updated_at);
    }
}
