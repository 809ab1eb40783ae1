//! On-disk analysis store: one JSON file per run plus per-project state files.
//!
//! Layout under the injected data root:
//!
//! ```text
//! <root>/<project_id>/
//!   2026-01-02T03-04-05.678Z.json   one immutable file per analysis run
//!   metadata.json                   derived summary, overwritten per run
//!   settings.json                   live settings, overwritten on update
//!   ignore_patterns.json            project-specific pattern overrides
//! ```
//!
//! This module exclusively owns the on-disk representation; nothing else
//! reads or writes under the data root. Every write goes through a
//! temp-file-then-rename so readers never observe a truncated file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::errors::{Result, ShapeError};
use crate::scoring::shape_score;
use crate::store::records::{
    AnalysisRecord, ProjectMetadata, ProjectSettings, timestamp_file_stem,
};

const METADATA_FILE: &str = "metadata.json";
const SETTINGS_FILE: &str = "settings.json";
const IGNORE_PATTERNS_FILE: &str = "ignore_patterns.json";

/// File-backed store for analysis snapshots and per-project state.
#[derive(Debug, Clone)]
pub struct AnalysisStore {
    root: PathBuf,
}

impl AnalysisStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    /// Persist one analysis run and refresh the project's metadata summary.
    pub fn save(&self, record: &AnalysisRecord) -> Result<()> {
        let dir = self.project_dir(&record.id);
        fs::create_dir_all(&dir).map_err(|e| ShapeError::io(&dir, e))?;

        let file_name = format!("{}.json", timestamp_file_stem(&record.timestamp));
        write_json_atomic(&dir.join(file_name), record)?;

        let metadata = ProjectMetadata {
            id: record.id.clone(),
            name: record.name.clone(),
            path: record.path.clone(),
            last_analyzed: record.timestamp.clone(),
            analysis_count: 0,
        };
        write_json_atomic(&dir.join(METADATA_FILE), &metadata)
    }

    /// Load every stored run for a project, most recent first.
    ///
    /// Records persisted without a shape score get one backfilled here from
    /// the project's current threshold — a load-time migration, kept out of
    /// the analyze path. Malformed record files abort the load with an error
    /// naming the file.
    pub fn load_history(&self, project_id: &str) -> Result<Vec<AnalysisRecord>> {
        let dir = self.project_dir(project_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut threshold: Option<i64> = None;

        for entry in fs::read_dir(&dir).map_err(|e| ShapeError::io(&dir, e))? {
            let entry = entry.map_err(|e| ShapeError::io(&dir, e))?;
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }

            let mut record: AnalysisRecord =
                read_json(&path).map_err(|err| ShapeError::CorruptRecord {
                    path: path.clone(),
                    details: err.to_string(),
                })?;

            if record.shape_score.is_none() {
                let t = match threshold {
                    Some(t) => t,
                    None => {
                        let t = self.load_settings(project_id)?.threshold;
                        threshold = Some(t);
                        t
                    }
                };
                record.shape_score = Some(shape_score(
                    &record.files,
                    record.total_files,
                    record.total_lines,
                    t,
                ));
            }
            records.push(record);
        }

        // Fixed-width timestamps: lexicographic == chronological.
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Most recent run for a project.
    pub fn latest(&self, project_id: &str) -> Result<AnalysisRecord> {
        self.load_history(project_id)?
            .into_iter()
            .next()
            .ok_or_else(|| ShapeError::HistoryNotFound {
                project_id: project_id.to_string(),
            })
    }

    /// Project-specific ignore patterns; empty if never set.
    pub fn load_ignore_patterns(&self, project_id: &str) -> Result<Vec<String>> {
        let path = self.project_dir(project_id).join(IGNORE_PATTERNS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    /// Overwrite the project's ignore-pattern overrides.
    pub fn save_ignore_patterns(&self, project_id: &str, patterns: &[String]) -> Result<()> {
        let dir = self.project_dir(project_id);
        fs::create_dir_all(&dir).map_err(|e| ShapeError::io(&dir, e))?;
        write_json_atomic(&dir.join(IGNORE_PATTERNS_FILE), &patterns)
    }

    /// Whether the project has ever stored settings.
    pub fn has_settings(&self, project_id: &str) -> bool {
        self.project_dir(project_id).join(SETTINGS_FILE).exists()
    }

    /// Per-project settings; defaults when never stored.
    pub fn load_settings(&self, project_id: &str) -> Result<ProjectSettings> {
        let path = self.project_dir(project_id).join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(ProjectSettings::default());
        }
        read_json(&path)
    }

    /// Overwrite the project's live settings.
    pub fn save_settings(&self, project_id: &str, settings: &ProjectSettings) -> Result<()> {
        let dir = self.project_dir(project_id);
        fs::create_dir_all(&dir).map_err(|e| ShapeError::io(&dir, e))?;
        write_json_atomic(&dir.join(SETTINGS_FILE), settings)
    }

    /// Every known project with metadata, most recently analyzed first.
    ///
    /// `analysis_count` is recomputed from the record files on every call
    /// rather than trusted from the stored summary.
    pub fn list_projects(&self) -> Result<Vec<ProjectMetadata>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| ShapeError::io(&self.root, e))? {
            let entry = entry.map_err(|e| ShapeError::io(&self.root, e))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let metadata_path = dir.join(METADATA_FILE);
            if !metadata_path.exists() {
                continue;
            }

            let mut metadata: ProjectMetadata = read_json(&metadata_path)?;
            metadata.analysis_count = count_record_files(&dir)?;
            projects.push(metadata);
        }

        projects.sort_by(|a, b| b.last_analyzed.cmp(&a.last_analyzed));
        Ok(projects)
    }
}

/// A record file is any `.json` that is not one of the reserved state files.
fn is_record_file(path: &Path) -> bool {
    if path.extension().is_none_or(|ext| ext != "json") {
        return false;
    }
    let name = path.file_name().map(|n| n.to_string_lossy());
    !matches!(
        name.as_deref(),
        None | Some(METADATA_FILE | SETTINGS_FILE | IGNORE_PATTERNS_FILE)
    )
}

fn count_record_files(dir: &Path) -> Result<u64> {
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(|e| ShapeError::io(dir, e))? {
        let entry = entry.map_err(|e| ShapeError::io(dir, e))?;
        if is_record_file(&entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| ShapeError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write pretty-printed JSON via a sibling temp file and rename, so a crash
/// or concurrent reader never sees a partial file.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).map_err(|e| ShapeError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ShapeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::FileEntry;
    use tempfile::TempDir;

    fn record(id: &str, timestamp: &str, lines: u64, score: Option<f64>) -> AnalysisRecord {
        AnalysisRecord {
            id: id.to_string(),
            name: "proj".to_string(),
            path: "/repo/proj".to_string(),
            timestamp: timestamp.to_string(),
            total_files: 1,
            total_lines: lines,
            average_lines: lines as f64,
            shape_score: score,
            files: vec![FileEntry {
                path: "a.py".to_string(),
                name: "a.py".to_string(),
                lines,
            }],
        }
    }

    #[test]
    fn save_then_history_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let rec = record("aaaabbbbcccc", "2026-01-02T03:04:05.000Z", 50, Some(16.0));

        store.save(&rec).unwrap();
        let history = store.load_history("aaaabbbbcccc").unwrap();
        assert_eq!(history, vec![rec]);
    }

    #[test]
    fn history_is_ordered_most_recent_first_regardless_of_save_order() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let t1 = "2026-01-01T00:00:00.000Z";
        let t2 = "2026-01-02T00:00:00.000Z";
        let t3 = "2026-01-03T00:00:00.000Z";

        for ts in [t2, t1, t3] {
            store.save(&record("aaaabbbbcccc", ts, 10, Some(11.0))).unwrap();
        }

        let stamps: Vec<String> = store
            .load_history("aaaabbbbcccc")
            .unwrap()
            .into_iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(stamps, vec![t3, t2, t1]);
    }

    #[test]
    fn history_for_unknown_project_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        assert!(store.load_history("nosuchproject").unwrap().is_empty());
    }

    #[test]
    fn latest_fails_with_not_found_on_empty_history() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let err = store.latest("nosuchproject").unwrap_err();
        assert_eq!(err.code(), "CSH-1101");
    }

    #[test]
    fn missing_score_is_backfilled_with_current_threshold() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let id = "aaaabbbbcccc";

        store
            .save_settings(id, &ProjectSettings { threshold: 100 })
            .unwrap();
        store
            .save(&record(id, "2026-01-02T03:04:05.000Z", 150, None))
            .unwrap();

        let history = store.load_history(id).unwrap();
        // 1*10 + 150*0.1 + (50^2 * 0.01) = 50.0
        assert_eq!(history[0].shape_score, Some(50.0));

        // Backfill is in-memory only; the stored file stays scoreless.
        let raw = fs::read_to_string(
            tmp.path().join(id).join("2026-01-02T03-04-05.000Z.json"),
        )
        .unwrap();
        assert!(!raw.contains("shape_score"));
    }

    #[test]
    fn stored_score_is_not_recomputed() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let id = "aaaabbbbcccc";
        store
            .save(&record(id, "2026-01-02T03:04:05.000Z", 150, Some(1234.5)))
            .unwrap();

        let history = store.load_history(id).unwrap();
        assert_eq!(history[0].shape_score, Some(1234.5));
    }

    #[test]
    fn corrupt_record_file_is_surfaced_with_its_path() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let id = "aaaabbbbcccc";
        store
            .save(&record(id, "2026-01-02T03:04:05.000Z", 10, Some(11.0)))
            .unwrap();
        fs::write(
            tmp.path().join(id).join("2026-01-03T00-00-00.000Z.json"),
            "{ not json",
        )
        .unwrap();

        let err = store.load_history(id).unwrap_err();
        assert_eq!(err.code(), "CSH-2002");
        assert!(err.to_string().contains("2026-01-03T00-00-00.000Z.json"));
    }

    #[test]
    fn ignore_patterns_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let patterns = vec!["*.generated".to_string(), "vendor/".to_string()];

        assert!(store.load_ignore_patterns("deadbeef0000").unwrap().is_empty());
        store.save_ignore_patterns("deadbeef0000", &patterns).unwrap();
        assert_eq!(store.load_ignore_patterns("deadbeef0000").unwrap(), patterns);
    }

    #[test]
    fn settings_round_trip_and_default() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());

        assert_eq!(store.load_settings("deadbeef0000").unwrap().threshold, 100);
        store
            .save_settings("deadbeef0000", &ProjectSettings { threshold: 42 })
            .unwrap();
        assert_eq!(store.load_settings("deadbeef0000").unwrap().threshold, 42);
    }

    #[test]
    fn list_projects_counts_records_live_and_sorts_by_recency() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());

        store
            .save(&record("older0000000", "2026-01-01T00:00:00.000Z", 10, Some(1.0)))
            .unwrap();
        store
            .save(&record("newer0000000", "2026-01-02T00:00:00.000Z", 10, Some(1.0)))
            .unwrap();
        store
            .save(&record("newer0000000", "2026-01-03T00:00:00.000Z", 10, Some(1.0)))
            .unwrap();
        // State files must not count as analyses.
        store
            .save_settings("newer0000000", &ProjectSettings::default())
            .unwrap();

        let projects = store.list_projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "newer0000000");
        assert_eq!(projects[0].analysis_count, 2);
        assert_eq!(projects[1].id, "older0000000");
        assert_eq!(projects[1].analysis_count, 1);
    }

    #[test]
    fn list_projects_on_missing_root_is_empty() {
        let store = AnalysisStore::new("/definitely/does/not/exist");
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn writes_leave_no_temp_files_behind() {
        let tmp = TempDir::new().unwrap();
        let store = AnalysisStore::new(tmp.path());
        let id = "aaaabbbbcccc";
        store
            .save(&record(id, "2026-01-02T03:04:05.000Z", 10, Some(11.0)))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path().join(id))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
