//! Error classification and recovery
//!
//! Every risky step of a turn runs through this layer. Classification is a
//! pattern match from adapter errors into the domain's single tagged
//! [`InterviewError`]; recovery is exponential backoff with jitter for
//! recoverable categories and checkpoint-before-propagate for everything
//! that surfaces.

use crate::ports::provider::ProviderError;
use crate::ports::state_store::{StateStore, StateStoreError};
use prdgen_domain::{ErrorCategory, InterviewError, InterviewState};
use rand::Rng;
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry policy for one session.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
    /// Add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Map transport-level I/O failures onto the taxonomy.
fn classify_io(err: &std::io::Error) -> ErrorCategory {
    match err.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => ErrorCategory::Network,
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::NotFound | ErrorKind::PermissionDenied => ErrorCategory::Provider,
        _ => ErrorCategory::Process,
    }
}

impl From<ProviderError> for InterviewError {
    fn from(err: ProviderError) -> Self {
        let category = match &err {
            ProviderError::NotAvailable(_)
            | ProviderError::NotSpawned
            | ProviderError::Busy
            | ProviderError::Protocol(_)
            | ProviderError::Remote(_) => ErrorCategory::Provider,
            ProviderError::SpawnFailed(_) => ErrorCategory::Provider,
            ProviderError::Io(io) => classify_io(io),
            ProviderError::TransportClosed | ProviderError::ProcessExited { .. } => {
                ErrorCategory::Process
            }
            ProviderError::Timeout(_) => ErrorCategory::Timeout,
            ProviderError::Cancelled => ErrorCategory::Cancelled,
        };
        InterviewError::new(category, err.to_string()).with_source(err)
    }
}

impl From<StateStoreError> for InterviewError {
    fn from(err: StateStoreError) -> Self {
        InterviewError::new(ErrorCategory::State, err.to_string()).with_source(err)
    }
}

/// Execute `op`, retrying recoverable failures with exponential backoff.
///
/// The surfaced error is annotated with the number of attempts made. A
/// pending backoff sleep is aborted immediately when `cancel` fires;
/// cancellation never waits out a delay.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    options: &RetryOptions,
    cancel: &CancellationToken,
) -> Result<T, InterviewError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InterviewError>>,
{
    let max_attempts = options.max_attempts.max(1);
    let mut delay = options.backoff;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(InterviewError::cancelled().with_attempts(attempt));
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_recoverable() || attempt == max_attempts {
                    return Err(err.with_attempts(attempt));
                }

                let sleep_for = apply_jitter(delay, options.jitter);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    err.category, attempt, max_attempts, sleep_for, err
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(InterviewError::cancelled().with_attempts(attempt));
                    }
                    _ = tokio::time::sleep(sleep_for) => {}
                }

                delay = (delay * 2).min(options.max_backoff);
            }
        }
    }

    unreachable!("retry loop returns from within");
}

fn apply_jitter(delay: Duration, jitter: bool) -> Duration {
    if !jitter || delay.is_zero() {
        return delay;
    }
    let spread = delay.as_millis() as u64 / 2;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

/// Best-effort checkpoint. A save failure is logged as a secondary
/// diagnostic and must never replace or suppress the error already being
/// propagated. Returns whether the checkpoint landed.
pub fn try_save_state(store: &dyn StateStore, state: &InterviewState) -> bool {
    match store.save(state) {
        Ok(()) => {
            debug!("checkpoint saved (phase {})", state.phase);
            true
        }
        Err(e) => {
            warn!("checkpoint failed while handling another error: {}", e);
            false
        }
    }
}

/// Retry `op`, and if it still fails, checkpoint the last good state
/// exactly once before propagating: the caller never sees an error
/// without the state being on disk first.
pub async fn with_error_recovery<T, F, Fut>(
    op: F,
    state: &InterviewState,
    store: &dyn StateStore,
    options: &RetryOptions,
    cancel: &CancellationToken,
) -> Result<T, InterviewError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InterviewError>>,
{
    match with_retry(op, options, cancel).await {
        Ok(value) => Ok(value),
        Err(err) => {
            try_save_state(store, state);
            Err(err)
        }
    }
}

/// Non-propagating variant for call sites (cleanup paths) where the error
/// is diagnostic only: the classified failure goes to the log and the
/// caller gets `None`.
pub async fn safe_execute<T, Fut>(op: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, InterviewError>>,
{
    match op.await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("ignored failure in {} step: {}", err.category, err);
            None
        }
    }
}
