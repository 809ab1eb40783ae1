//! JSONL activity log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object. Lines are assembled in memory
//! and written with a single `write_all` so a concurrent tail never sees a
//! partial line. Logging must never fail an analysis: on write failure the
//! writer degrades to stderr with a `[CODESHAPE-LOG]` prefix, and finally to
//! silent discard.

#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::records::utc_timestamp;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Event types in the codeshape activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AnalysisComplete,
    ScanWarning,
    Error,
}

/// A single JSONL entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: utc_timestamp(),
            event,
            severity,
            project_id: None,
            path: None,
            total_files: None,
            total_lines: None,
            shape_score: None,
            duration_ms: None,
            error_code: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL activity log with a two-step degradation chain.
pub struct ActivityLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl ActivityLog {
    /// Open (or create) the activity log. Failure to open degrades rather
    /// than erroring.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut log = Self {
            path,
            writer: None,
            state: WriterState::Discard,
        };
        log.try_open();
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_open(&mut self) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && std::fs::create_dir_all(parent).is_err()
        {
            self.state = WriterState::Stderr;
            return;
        }
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => {
                self.writer = Some(BufWriter::new(file));
                self.state = WriterState::Normal;
            }
            Err(_) => self.state = WriterState::Stderr,
        }
    }

    /// Write one entry as a single atomic line. Never fails.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let Ok(mut line) = serde_json::to_string(entry) else {
            return;
        };
        line.push('\n');

        if self.state == WriterState::Normal
            && let Some(writer) = self.writer.as_mut()
        {
            if writer.write_all(line.as_bytes()).and_then(|()| writer.flush()).is_ok() {
                return;
            }
            self.writer = None;
            self.state = WriterState::Stderr;
        }

        if self.state == WriterState::Stderr {
            let stderr = std::io::stderr();
            let mut handle = stderr.lock();
            if write!(handle, "[CODESHAPE-LOG] {line}").is_err() {
                self.state = WriterState::Discard;
            }
        }
    }
}
