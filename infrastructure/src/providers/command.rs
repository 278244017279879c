//! Per-provider launch profiles
//!
//! Each supported AI CLI is described by a [`ProviderCommand`]: the binary
//! to look up on PATH and the flags that put it into line-delimited JSON
//! session mode. Availability and version are probed through the same
//! profile.

use prdgen_domain::ProviderKind;
use std::process::Command;
use tracing::debug;

/// How to launch and probe one provider CLI.
#[derive(Debug, Clone)]
pub struct ProviderCommand {
    kind: ProviderKind,
    binary: String,
    launch_args: Vec<String>,
}

impl ProviderCommand {
    /// The built-in profile for a provider kind.
    pub fn for_kind(kind: ProviderKind) -> Self {
        let (binary, launch_args): (&str, &[&str]) = match kind {
            ProviderKind::Claude => (
                "claude",
                &["--input-format", "stream-json", "--output-format", "stream-json"],
            ),
            ProviderKind::Codex => ("codex", &["proto"]),
            ProviderKind::Gemini => ("gemini", &["--output-format", "stream-json"]),
        };
        Self {
            kind,
            binary: binary.to_string(),
            launch_args: launch_args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A custom command profile (useful for testing with a fake CLI).
    pub fn custom(
        kind: ProviderKind,
        binary: impl Into<String>,
        launch_args: Vec<String>,
    ) -> Self {
        Self {
            kind,
            binary: binary.into(),
            launch_args,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn launch_args(&self) -> &[String] {
        &self.launch_args
    }

    /// Whether the binary resolves on PATH.
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    /// Probe `<binary> --version`, returning the first output line.
    ///
    /// Runs synchronously; intended for startup, not the turn loop.
    pub fn probe_version(&self) -> Option<String> {
        let output = Command::new(&self.binary).arg("--version").output().ok()?;
        if !output.status.success() {
            debug!("{} --version exited with {}", self.binary, output.status);
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        text.lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_cover_all_kinds() {
        for kind in ProviderKind::all() {
            let cmd = ProviderCommand::for_kind(*kind);
            assert_eq!(cmd.kind(), *kind);
            assert!(!cmd.binary().is_empty());
        }
    }

    #[test]
    fn missing_binary_is_not_available() {
        let cmd = ProviderCommand::custom(
            ProviderKind::Claude,
            "definitely-not-a-real-binary-name",
            vec![],
        );
        assert!(!cmd.is_available());
        assert!(cmd.probe_version().is_none());
    }

    #[test]
    fn custom_profile_keeps_args() {
        let cmd = ProviderCommand::custom(
            ProviderKind::Codex,
            "sh",
            vec!["-c".to_string(), "true".to_string()],
        );
        assert_eq!(cmd.launch_args().len(), 2);
        assert!(cmd.is_available());
    }
}
