//! Persisted entity types and project identity derivation.
//!
//! Every entity is a typed serde struct; unknown JSON fields are dropped on
//! read instead of being carried through untyped.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::paths::resolve_absolute_path;

/// Length of the hex project identifier.
pub const PROJECT_ID_LEN: usize = 12;

/// One counted file inside an analysis snapshot. Immutable once created;
/// files with zero lines never become entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the analyzed root.
    pub path: String,
    /// Base filename.
    pub name: String,
    /// Newline-delimited record count.
    pub lines: u64,
}

/// One immutable analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Stable project identifier (hash of the canonical absolute path).
    pub id: String,
    /// Display name (defaults to the directory name).
    pub name: String,
    /// Canonical absolute path of the analyzed root.
    pub path: String,
    /// Fixed-width UTC ISO-8601 timestamp; lexicographic order equals
    /// chronological order.
    pub timestamp: String,
    pub total_files: u64,
    pub total_lines: u64,
    pub average_lines: f64,
    /// Absent on records persisted before scoring existed; backfilled at
    /// load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_score: Option<f64>,
    /// Sorted by `lines` descending, path ascending on ties.
    pub files: Vec<FileEntry>,
}

/// Live per-project settings, overwritten on update (not versioned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Line-count cutoff above which a file incurs quadratic penalty.
    pub threshold: i64,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self { threshold: 100 }
    }
}

/// Derived per-project summary, recomputed on every new analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub id: String,
    pub name: String,
    pub path: String,
    pub last_analyzed: String,
    /// Live count of stored analysis records; recomputed on listing, never
    /// persisted as truth.
    #[serde(default)]
    pub analysis_count: u64,
}

/// Derive the stable project identifier from a filesystem path.
///
/// Same absolute path always yields the same id; the path is canonicalized
/// first so `./proj` and `/home/user/proj` agree.
#[must_use]
pub fn project_id(path: &Path) -> String {
    let canonical = resolve_absolute_path(path);
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let mut id = String::with_capacity(PROJECT_ID_LEN);
    for byte in digest.iter().take(PROJECT_ID_LEN.div_ceil(2)) {
        id.push_str(&format!("{byte:02x}"));
    }
    id.truncate(PROJECT_ID_LEN);
    id
}

/// Current UTC time in the fixed-width record format.
#[must_use]
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Encode a record timestamp as a filesystem-safe file stem (`:` → `-`).
#[must_use]
pub fn timestamp_file_stem(timestamp: &str) -> String {
    timestamp.replace(':', "-")
}
