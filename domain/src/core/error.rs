//! Domain error types
//!
//! Failures are modelled as a single tagged [`InterviewError`] over
//! [`ErrorCategory`], not a type hierarchy. The category determines the
//! retry policy:
//!
//! | Category | Retryable? | Typical cause |
//! |----------|-----------|---------------|
//! | `Network` | Yes | Connectivity loss while talking to the provider |
//! | `Provider` | Yes | AI CLI missing or misbehaving |
//! | `Process` | Yes | Child process crashed or was killed |
//! | `Timeout` | Yes | No response within the configured bound |
//! | `State` | No | Corrupt or invalid persisted interview state |
//! | `Cancelled` | No | Explicit user interrupt |
//! | `Unknown` | No | Anything unmapped |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an interview failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connectivity problem between us and the provider.
    Network,
    /// The provider CLI is missing, unavailable, or returned garbage.
    Provider,
    /// The provider child process died unexpectedly.
    Process,
    /// Persisted interview state is corrupt or has the wrong version.
    State,
    /// The provider did not answer within the configured bound.
    Timeout,
    /// The user cancelled the session.
    Cancelled,
    /// Unmapped failure.
    Unknown,
}

impl ErrorCategory {
    /// Fixed recovery policy: transient transport and process failures are
    /// retried, everything else propagates immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Network
                | ErrorCategory::Provider
                | ErrorCategory::Process
                | ErrorCategory::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Provider => "provider",
            ErrorCategory::Process => "process",
            ErrorCategory::State => "state",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Fixed, cause-free message shown to the end user for this category.
    ///
    /// Raw causes and diagnostics go to the tracing log only.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Lost the connection to the AI assistant. Check your network and try again."
            }
            ErrorCategory::Provider => {
                "The AI CLI is not responding. Make sure it is installed and signed in."
            }
            ErrorCategory::Process => {
                "The AI assistant process stopped unexpectedly. Your progress has been saved."
            }
            ErrorCategory::State => {
                "The saved interview file is invalid. Delete it and start a new interview."
            }
            ErrorCategory::Timeout => {
                "The AI assistant took too long to answer. Your progress has been saved."
            }
            ErrorCategory::Cancelled => "Interview cancelled. Your progress has been saved.",
            ErrorCategory::Unknown => {
                "Something went wrong. Your progress has been saved; resume to continue."
            }
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified interview failure: category, message, optional cause, and
/// the number of attempts made before it surfaced.
#[derive(Debug)]
pub struct InterviewError {
    pub category: ErrorCategory,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Attempts made by the retry layer before this error surfaced.
    pub attempts: u32,
}

impl InterviewError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source: None,
            attempts: 1,
        }
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    // Common constructors
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Provider, message)
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Process, message)
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::State, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCategory::Cancelled, "operation cancelled")
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, message)
    }

    /// Whether the retry layer may try this operation again.
    pub fn is_recoverable(&self) -> bool {
        self.category.is_recoverable()
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.category == ErrorCategory::Cancelled
    }

    /// The fixed per-category message safe to show the user.
    pub fn user_message(&self) -> &'static str {
        self.category.user_message()
    }
}

impl fmt::Display for InterviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)?;
        if self.attempts > 1 {
            write!(f, " (after {} attempts)", self.attempts)?;
        }
        Ok(())
    }
}

impl std::error::Error for InterviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
