//! On-disk configuration schema
//!
//! All fields have defaults so a missing or partial config file is never an
//! error; the file only overrides what it mentions.

use prdgen_application::recovery::RetryOptions;
use prdgen_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root of the `prdgen.toml` schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub provider: ProviderSection,
    pub retry: RetrySection,
    pub context: ContextSection,
    pub output: OutputSection,
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    /// Default provider when `--provider` is not given.
    pub default: String,
    /// Bound on waiting for one provider reply.
    pub receive_timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            default: ProviderKind::default().as_str().to_string(),
            receive_timeout_secs: 120,
        }
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

/// `[context]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSection {
    /// Extensions (lowercase, no dot) accepted for reference documents.
    pub allowed_extensions: Vec<String>,
    /// Per-file size cap; larger files are skipped.
    pub max_file_bytes: u64,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            allowed_extensions: ["md", "markdown", "txt", "json", "yaml", "yml", "toml"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_bytes: 64 * 1024,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Default path for the rendered PRD.
    pub path: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: "prd.md".to_string(),
        }
    }
}

impl FileConfig {
    /// The configured default provider.
    pub fn provider_kind(&self) -> Result<ProviderKind, String> {
        self.provider.default.parse()
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.receive_timeout_secs)
    }

    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.retry.max_attempts.max(1),
            backoff: Duration::from_millis(self.retry.backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            jitter: true,
        }
    }
}
