//! Local file system reference-document loader
//!
//! Implements [`ContextLoaderPort`] with an extension allow-list and a
//! per-file size cap. Files that fail either check, or cannot be read, are
//! skipped with a warning; a bad reference file never blocks the
//! interview.

use prdgen_application::ports::context_loader::{ContextLoaderPort, LoadedContextFile};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Context loader that reads from the local file system.
#[derive(Debug, Clone)]
pub struct LocalContextLoader {
    allowed_extensions: Vec<String>,
    max_file_bytes: u64,
}

impl LocalContextLoader {
    pub fn new(allowed_extensions: Vec<String>, max_file_bytes: u64) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            max_file_bytes,
        }
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.allowed_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    fn try_load(&self, path: &Path) -> Option<LoadedContextFile> {
        if !self.extension_allowed(path) {
            warn!(
                "skipping context file {} (extension not allowed)",
                path.display()
            );
            return None;
        }

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!("skipping context file {}: {}", path.display(), e);
                return None;
            }
        };
        if metadata.len() > self.max_file_bytes {
            warn!(
                "skipping context file {} ({} bytes exceeds the {} byte cap)",
                path.display(),
                metadata.len(),
                self.max_file_bytes
            );
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("skipping context file {}: {}", path.display(), e);
                return None;
            }
        };
        if content.trim().is_empty() {
            debug!("skipping empty context file {}", path.display());
            return None;
        }

        Some(LoadedContextFile {
            path: path.to_path_buf(),
            content,
        })
    }
}

impl ContextLoaderPort for LocalContextLoader {
    fn load_files(&self, paths: &[PathBuf]) -> Vec<LoadedContextFile> {
        let files: Vec<LoadedContextFile> =
            paths.iter().filter_map(|p| self.try_load(p)).collect();
        debug!("loaded {}/{} context files", files.len(), paths.len());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> LocalContextLoader {
        LocalContextLoader::new(vec!["md".to_string(), "txt".to_string()], 1024)
    }

    #[test]
    fn loads_allowed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\nSome context.").unwrap();

        let files = loader().load_files(&[path.clone()]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, path);
        assert!(files[0].content.contains("Some context."));
    }

    #[test]
    fn disallowed_extension_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.exe");
        fs::write(&path, "MZ").unwrap();
        assert!(loader().load_files(&[path]).is_empty());
    }

    #[test]
    fn extensionless_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, "all:").unwrap();
        assert!(loader().load_files(&[path]).is_empty());
    }

    #[test]
    fn oversized_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(2048)).unwrap();
        assert!(loader().load_files(&[path]).is_empty());
    }

    #[test]
    fn missing_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.md");
        let present = dir.path().join("here.md");
        fs::write(&present, "content").unwrap();

        let files = loader().load_files(&[missing, present]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.MD");
        fs::write(&path, "upper").unwrap();
        assert_eq!(loader().load_files(&[path]).len(), 1);
    }
}
