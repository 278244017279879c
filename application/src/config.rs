//! Orchestrator configuration
//!
//! An [`OrchestratorConfig`] is built once per session and never mutated
//! afterwards; there are no process-wide defaults. Context content is
//! preloaded so the system prompt renders deterministically.

use crate::recovery::RetryOptions;
use prdgen_domain::{Feature, ProviderKind};
use std::path::PathBuf;
use std::time::Duration;

/// Immutable construction-time bundle for an interview session.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// The feature under discussion.
    pub feature: Feature,
    /// Which AI CLI drives the session.
    pub provider: ProviderKind,
    /// Interview from first principles (question the framing itself).
    pub first_principles: bool,
    /// Paths of the reference documents (recorded in state for resume).
    pub context_files: Vec<PathBuf>,
    /// Preloaded reference content injected into the system prompt.
    pub context_content: String,
    /// Retry policy for every risky step.
    pub retry: RetryOptions,
    /// Bound on waiting for one provider reply.
    pub receive_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn new(feature: Feature, provider: ProviderKind) -> Self {
        Self {
            feature,
            provider,
            first_principles: false,
            context_files: Vec::new(),
            context_content: String::new(),
            retry: RetryOptions::default(),
            receive_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_first_principles(mut self, enabled: bool) -> Self {
        self.first_principles = enabled;
        self
    }

    pub fn with_context(mut self, files: Vec<PathBuf>, content: String) -> Self {
        self.context_files = files;
        self.context_content = content;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = OrchestratorConfig::new(Feature::new("search"), ProviderKind::Gemini)
            .with_first_principles(true)
            .with_context(vec![PathBuf::from("api.md")], "api notes".to_string())
            .with_receive_timeout(Duration::from_secs(30));

        assert_eq!(config.provider, ProviderKind::Gemini);
        assert!(config.first_principles);
        assert_eq!(config.context_files.len(), 1);
        assert_eq!(config.receive_timeout, Duration::from_secs(30));
    }
}
