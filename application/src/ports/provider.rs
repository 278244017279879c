//! Provider capability port
//!
//! Defines the interface for driving a subprocess AI CLI. Implementations
//! (adapters) live in the infrastructure layer, one per [`ProviderKind`];
//! each adapter normalizes its CLI's raw streaming output into plain text
//! before the response parser sees it.

use async_trait::async_trait;
use prdgen_domain::ProviderKind;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving a provider CLI
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider CLI '{0}' not found on PATH")]
    NotAvailable(String),

    #[error("failed to spawn provider: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("provider I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider transport closed")]
    TransportClosed,

    #[error("provider process exited unexpectedly (code {code:?})")]
    ProcessExited { code: Option<i32> },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("provider reported an error: {0}")]
    Remote(String),

    #[error("a previous receive is still outstanding")]
    Busy,

    #[error("provider not spawned")]
    NotSpawned,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,
}

/// One complete reply from the provider.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    /// Normalized text of the reply.
    pub content: String,
    /// Whether the provider marked the reply as the end of its turn.
    pub is_complete: bool,
    /// Structured payload pre-extracted by the CLI itself, if any.
    /// Most CLIs leave this unset; the marker convention lives in `content`.
    pub structured: Option<serde_json::Value>,
}

impl ProviderReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: true,
            structured: None,
        }
    }
}

/// A subprocess AI CLI capable of holding one conversation.
///
/// The contract is strictly sequential: `spawn` once, then alternating
/// `send` / `receive` pairs. A `send` while a `receive` is outstanding is
/// rejected with [`ProviderError::Busy`] rather than queued.
#[async_trait]
pub trait AiProvider: Send {
    /// Which CLI this adapter drives.
    fn kind(&self) -> ProviderKind;

    /// Whether the CLI binary is present and usable.
    fn is_available(&self) -> bool;

    /// The CLI's reported version, if it could be probed.
    fn version(&self) -> Option<String>;

    /// Start the child process, priming it with the system prompt.
    async fn spawn(&mut self, system_prompt: &str) -> Result<(), ProviderError>;

    /// Send one user message.
    async fn send(&mut self, message: &str) -> Result<(), ProviderError>;

    /// Await the complete reply to the last `send`.
    async fn receive(&mut self) -> Result<ProviderReply, ProviderError>;

    /// Whether the child process is currently alive.
    fn is_running(&self) -> bool;

    /// Terminate the child: graceful signal first, forced kill after a
    /// grace period.
    async fn cleanup(&mut self) -> Result<(), ProviderError>;
}
