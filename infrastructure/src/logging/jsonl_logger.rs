//! JSONL transcript writer
//!
//! Each [`ConversationEvent`] becomes one JSON line with `type` and
//! `timestamp` fields merged into the payload, appended under `.prdgen/`.
//! The transcript is append-only across sessions, so a resumed interview
//! continues the same file.

use crate::state::json_store::STATE_DIR;
use prdgen_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Transcript file name within the state directory.
pub const TRANSCRIPT_FILE: &str = "transcript.jsonl";

/// Appending JSONL transcript logger.
///
/// Thread-safe via `Mutex<BufWriter<File>>`; each event is flushed
/// immediately so a crash never loses recorded turns.
pub struct JsonlTranscriptLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTranscriptLogger {
    /// Logger at the well-known relative path `.prdgen/transcript.jsonl`.
    pub fn new() -> Option<Self> {
        Self::at(Path::new(STATE_DIR).join(TRANSCRIPT_FILE))
    }

    /// Logger at an explicit path. Creates parent directories as needed;
    /// returns `None` (with a warning) if the file cannot be opened.
    pub fn at(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("could not open transcript file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConversationLogger for JsonlTranscriptLogger {
    fn log(&self, event: ConversationEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = match event.payload {
            serde_json::Value::Object(mut map) => {
                map.insert("type".to_string(), event.event_type.into());
                map.insert("timestamp".to_string(), timestamp.into());
                serde_json::Value::Object(map)
            }
            other => serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": other,
            }),
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlTranscriptLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_valid_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        let logger = JsonlTranscriptLogger::at(&path).unwrap();

        logger.log(ConversationEvent::new(
            "question",
            serde_json::json!({"prompt": "Who are the users?"}),
        ));
        logger.log(ConversationEvent::new(
            "answer",
            serde_json::json!({"answer": "Staff"}),
        ));
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "question");
        assert_eq!(first["prompt"], "Who are the users?");
        assert!(first.get("timestamp").is_some());
    }

    #[test]
    fn appends_across_logger_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");

        {
            let logger = JsonlTranscriptLogger::at(&path).unwrap();
            logger.log(ConversationEvent::new("turn", serde_json::json!({"n": 1})));
        }
        {
            let logger = JsonlTranscriptLogger::at(&path).unwrap();
            logger.log(ConversationEvent::new("turn", serde_json::json!({"n": 2})));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[test]
    fn non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let logger = JsonlTranscriptLogger::at(&path).unwrap();
        logger.log(ConversationEvent::new(
            "note",
            serde_json::json!("plain string"),
        ));
        drop(logger);

        let value: serde_json::Value =
            serde_json::from_str(std::fs::read_to_string(&path).unwrap().trim()).unwrap();
        assert_eq!(value["data"], "plain string");
    }
}
