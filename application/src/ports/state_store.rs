//! State persistence port
//!
//! The orchestrator checkpoints [`InterviewState`] through this port after
//! every turn. The adapter owns the bytes on disk; the shape and validation
//! rules are domain code. Loaders must reject version mismatches and
//! structurally invalid documents; there is no migration path.

use prdgen_domain::InterviewState;
use thiserror::Error;

/// Errors that can occur while loading or saving interview state
#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is corrupt: {0}")]
    Corrupt(String),

    #[error("state version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("invalid state: {0}")]
    Invalid(String),
}

/// Persistence for the single interview state document.
///
/// Exactly one writer exists per process (the orchestrator); the document
/// is not lock-protected and concurrent external edits are undefined
/// behavior.
pub trait StateStore: Send + Sync {
    /// Load the persisted state, if a resumable session exists.
    fn load(&self) -> Result<Option<InterviewState>, StateStoreError>;

    /// Persist a checkpoint, replacing any previous one atomically.
    fn save(&self, state: &InterviewState) -> Result<(), StateStoreError>;

    /// Remove the persisted state (on successful completion).
    fn delete(&self) -> Result<(), StateStoreError>;

    /// Whether a persisted session exists on disk.
    fn exists(&self) -> bool;
}
