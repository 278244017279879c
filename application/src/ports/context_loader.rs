//! Reference-document loading port
//!
//! User-supplied reference files are loaded once, before the session
//! starts, and injected verbatim into the system prompt. Loading is
//! allow-listed by extension and size-capped in the adapter; files that
//! fail the checks are skipped with a warning, never fatal.

use std::path::{Path, PathBuf};

/// A reference file that passed the allow-list and was read successfully.
#[derive(Debug, Clone)]
pub struct LoadedContextFile {
    pub path: PathBuf,
    pub content: String,
}

/// Loads user-supplied reference documents.
pub trait ContextLoaderPort: Send + Sync {
    /// Load every acceptable file among `paths`; unacceptable or unreadable
    /// entries are skipped (and logged by the adapter).
    fn load_files(&self, paths: &[PathBuf]) -> Vec<LoadedContextFile>;
}

/// Combine loaded files into the single context string the prompt template
/// consumes. Each file is labelled with its path so the assistant can cite
/// sources.
pub fn combine_context(files: &[LoadedContextFile]) -> String {
    let mut combined = String::new();
    for file in files {
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(&format!("--- {} ---\n", display_name(&file.path)));
        combined.push_str(file.content.trim_end());
    }
    combined
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_labels_each_file() {
        let files = vec![
            LoadedContextFile {
                path: PathBuf::from("notes.md"),
                content: "alpha\n".to_string(),
            },
            LoadedContextFile {
                path: PathBuf::from("api.json"),
                content: "{}".to_string(),
            },
        ];
        let combined = combine_context(&files);
        assert!(combined.contains("--- notes.md ---\nalpha"));
        assert!(combined.contains("--- api.json ---\n{}"));
    }

    #[test]
    fn combine_empty_is_empty() {
        assert_eq!(combine_context(&[]), "");
    }
}
