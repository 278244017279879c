//! Provider identity
//!
//! The closed set of AI CLIs an interview can be driven by. Each kind maps
//! to one adapter in the infrastructure layer.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An AI CLI that can drive an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic's `claude` CLI
    Claude,
    /// OpenAI's `codex` CLI
    Codex,
    /// Google's `gemini` CLI
    Gemini,
}

impl ProviderKind {
    /// Stable identifier used in persisted state and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Codex => "codex",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude",
            ProviderKind::Codex => "Codex",
            ProviderKind::Gemini => "Gemini",
        }
    }

    /// All providers, in preference order.
    pub fn all() -> &'static [ProviderKind] {
        &[ProviderKind::Claude, ProviderKind::Codex, ProviderKind::Gemini]
    }

    /// Whether the provider CLI retains conversational memory across
    /// processes. None of the supported CLIs do, so a resumed session must
    /// re-prime the provider with accumulated context before the next turn.
    pub fn retains_cross_process_memory(&self) -> bool {
        false
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Claude
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(ProviderKind::Claude),
            "codex" => Ok(ProviderKind::Codex),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{}' (expected one of: claude, codex, gemini)",
                other
            )),
        }
    }
}
