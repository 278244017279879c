//! JSON file state store
//!
//! Persists [`InterviewState`] as pretty-printed JSON at the fixed relative
//! path `.prdgen/interview.json`. Presence of the file implies a resumable
//! session. The document is versioned; a loader seeing any other version
//! (or a structurally invalid document) rejects it outright; there is no
//! migration path, and the file is not meant to be hand-edited.
//!
//! Saves write to a temporary file in the same directory and rename it into
//! place, so a crash mid-write can never corrupt the previous checkpoint.

use prdgen_application::ports::state_store::{StateStore, StateStoreError};
use prdgen_domain::{InterviewState, STATE_VERSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding prdgen's per-project files.
pub const STATE_DIR: &str = ".prdgen";
/// State file name within [`STATE_DIR`].
pub const STATE_FILE: &str = "interview.json";

/// File-backed [`StateStore`] with strict version checking.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Store at the well-known relative path `.prdgen/interview.json`.
    pub fn new() -> Self {
        Self {
            path: Path::new(STATE_DIR).join(STATE_FILE),
        }
    }

    /// Store at an explicit path (useful for testing).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for JsonStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Option<InterviewState>, StateStoreError> {
        let bytes = match fs::read_to_string(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateStoreError::Io(e)),
        };

        // Check the version discriminator before attempting a typed parse,
        // so a future schema is reported as a version mismatch rather than
        // a shape error.
        let value: serde_json::Value = serde_json::from_str(&bytes)
            .map_err(|e| StateStoreError::Corrupt(e.to_string()))?;
        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| StateStoreError::Corrupt("missing version field".into()))?
            as u32;
        if found != STATE_VERSION {
            return Err(StateStoreError::VersionMismatch {
                expected: STATE_VERSION,
                found,
            });
        }

        let state: InterviewState = serde_json::from_value(value)
            .map_err(|e| StateStoreError::Corrupt(e.to_string()))?;

        let issues = state.validate();
        if !issues.is_empty() {
            let detail: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            return Err(StateStoreError::Invalid(detail.join("; ")));
        }

        Ok(Some(state))
    }

    fn save(&self, state: &InterviewState) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StateStoreError::Invalid(e.to_string()))?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("state saved to {}", self.path.display());
        Ok(())
    }

    fn delete(&self) -> Result<(), StateStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateStoreError::Io(e)),
        }
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}
