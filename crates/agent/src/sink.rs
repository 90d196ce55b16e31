//! JSON-lines transcript log.
//!
//! Every transcript append becomes one line:
//!
//! ```text
//! {"run_id":"…","timestamp":"2026-01-01T00:00:00Z","role":"user","content":"what is 2+3?"}
//! ```
//!
//! The file is opened in append mode, so several runs share one log and
//! are told apart by `run_id`.

use chrono::{DateTime, Utc};
use reactor_core::error::SinkError;
use reactor_core::message::{Message, Role};
use reactor_core::sink::TranscriptSink;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// One line of the transcript log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

/// Appends transcript messages to a JSONL file.
pub struct JsonlTranscriptSink {
    path: PathBuf,
    run_id: Uuid,
    file: Mutex<File>,
}

impl JsonlTranscriptSink {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let run_id = Uuid::new_v4();
        debug!(path = %path.display(), %run_id, "Transcript log opened");

        Ok(Self {
            path,
            run_id,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier stamped on every line written by this sink.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl TranscriptSink for JsonlTranscriptSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn record(&self, message: &Message) -> Result<(), SinkError> {
        let entry = TranscriptEntry {
            run_id: self.run_id,
            timestamp: Utc::now(),
            role: message.role,
            content: message.content.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        // The handle stays valid after a poisoning panic.
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Read a transcript log back, skipping lines that do not parse.
pub fn read_entries(path: &Path) -> Result<Vec<TranscriptEntry>, SinkError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping corrupted transcript line");
                None
            }
        })
        .collect())
}
