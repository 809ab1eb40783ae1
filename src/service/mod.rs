//! Analysis orchestrator: wires settings, ignore rules, the scanner, the
//! score engine, and the store into the operations a transport binds to.
//!
//! Data flows one direction per request:
//! settings/patterns → scanner → file listing → score → record → store.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use crate::core::config::Config;
use crate::core::errors::{Result, ShapeError};
use crate::core::paths::resolve_absolute_path;
use crate::logger::jsonl::{ActivityLog, EventType, LogEntry, Severity};
use crate::scanner::patterns::effective_patterns;
use crate::scanner::walker::Scanner;
use crate::scoring::{average_lines, shape_score};
use crate::store::disk::AnalysisStore;
use crate::store::records::{
    AnalysisRecord, ProjectMetadata, ProjectSettings, project_id, utc_timestamp,
};

/// Name of the activity log file under the data root.
const ACTIVITY_LOG_FILE: &str = "activity.jsonl";

/// Parameters for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    /// Directory to analyze.
    pub path: PathBuf,
    /// Display name; defaults to the directory's final component.
    pub name: Option<String>,
    /// Caller-supplied ignore patterns. When empty or absent, the project's
    /// persisted patterns are used instead.
    pub ignore_patterns: Option<Vec<String>>,
    /// Keep only the largest N files in the listing (post-sort). `None`
    /// keeps everything.
    pub max_files: Option<usize>,
    /// Persist the caller-supplied patterns as the project's overrides
    /// before merging.
    pub save_ignore_patterns: bool,
}

impl AnalyzeRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Orchestrator over the scanner, score engine, and store.
pub struct AnalysisService {
    store: AnalysisStore,
    config: Config,
    activity: Mutex<ActivityLog>,
}

impl AnalysisService {
    /// Build a service from configuration; the store root and activity log
    /// both live under `storage.data_dir`.
    pub fn new(config: Config) -> Self {
        let store = AnalysisStore::new(&config.storage.data_dir);
        let activity = ActivityLog::open(config.storage.data_dir.join(ACTIVITY_LOG_FILE));
        Self {
            store,
            config,
            activity: Mutex::new(activity),
        }
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }

    /// Run one full analysis and persist the resulting record.
    ///
    /// Truncation to `max_files` happens after the sort (keeping the
    /// largest files) and BEFORE totals are computed, so the persisted
    /// aggregates describe exactly the files in the record. Changing that
    /// order would change historical scores.
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisRecord> {
        let started = Instant::now();

        if !request.path.exists() {
            return Err(ShapeError::PathNotFound {
                path: request.path.clone(),
            });
        }
        if !request.path.is_dir() {
            return Err(ShapeError::NotADirectory {
                path: request.path.clone(),
            });
        }

        let absolute = resolve_absolute_path(&request.path);
        let id = project_id(&absolute);
        let threshold = self.threshold_for(&id)?;

        let extras = match request.ignore_patterns.as_deref() {
            Some(explicit) if !explicit.is_empty() => {
                if request.save_ignore_patterns {
                    self.store.save_ignore_patterns(&id, explicit)?;
                }
                explicit.to_vec()
            }
            _ => self.store.load_ignore_patterns(&id)?,
        };
        let patterns = effective_patterns(&extras);

        let scan_result = Scanner::new(&absolute, patterns)
            .with_config(self.config.scanner.clone())
            .scan();
        let mut files = match scan_result {
            Ok(files) => files,
            Err(err) => {
                self.log_error(&id, &err);
                return Err(err);
            }
        };

        if let Some(max) = request.max_files
            && max > 0
            && files.len() > max
        {
            files.truncate(max);
        }

        let total_files = files.len() as u64;
        let total_lines: u64 = files.iter().map(|f| f.lines).sum();
        let score = shape_score(&files, total_files, total_lines, threshold);

        let name = request.name.clone().unwrap_or_else(|| {
            absolute
                .file_name()
                .map_or_else(|| absolute.to_string_lossy().into_owned(), |n| {
                    n.to_string_lossy().into_owned()
                })
        });

        let record = AnalysisRecord {
            id: id.clone(),
            name,
            path: absolute.to_string_lossy().into_owned(),
            timestamp: utc_timestamp(),
            total_files,
            total_lines,
            average_lines: average_lines(total_lines, total_files),
            shape_score: Some(score),
            files,
        };
        self.store.save(&record)?;

        self.log_analysis(&record, started.elapsed().as_millis() as u64);
        Ok(record)
    }

    /// Full history, most recent first. Empty history is NotFound.
    pub fn history(&self, project_id: &str) -> Result<Vec<AnalysisRecord>> {
        let records = self.store.load_history(project_id)?;
        if records.is_empty() {
            return Err(ShapeError::HistoryNotFound {
                project_id: project_id.to_string(),
            });
        }
        Ok(records)
    }

    /// Most recent analysis for a project.
    pub fn latest(&self, project_id: &str) -> Result<AnalysisRecord> {
        self.store.latest(project_id)
    }

    /// Project-specific ignore-pattern overrides (without the defaults).
    pub fn ignore_patterns(&self, project_id: &str) -> Result<Vec<String>> {
        self.store.load_ignore_patterns(project_id)
    }

    /// Overwrite the project's ignore-pattern overrides.
    pub fn set_ignore_patterns(&self, project_id: &str, patterns: &[String]) -> Result<()> {
        self.store.save_ignore_patterns(project_id, patterns)
    }

    /// Every known project, most recently analyzed first.
    pub fn list_projects(&self) -> Result<Vec<ProjectMetadata>> {
        self.store.list_projects()
    }

    /// Per-project settings (defaults when never stored).
    pub fn settings(&self, project_id: &str) -> Result<ProjectSettings> {
        self.store.load_settings(project_id)
    }

    /// Overwrite the project's live settings.
    pub fn set_settings(&self, project_id: &str, settings: &ProjectSettings) -> Result<()> {
        self.store.save_settings(project_id, settings)
    }

    /// A project that never stored settings falls back to the configured
    /// default threshold rather than the struct default.
    fn threshold_for(&self, project_id: &str) -> Result<i64> {
        if self.store.has_settings(project_id) {
            Ok(self.store.load_settings(project_id)?.threshold)
        } else {
            Ok(self.config.scoring.default_threshold)
        }
    }

    fn log_analysis(&self, record: &AnalysisRecord, duration_ms: u64) {
        let mut entry = LogEntry::new(EventType::AnalysisComplete, Severity::Info);
        entry.project_id = Some(record.id.clone());
        entry.path = Some(record.path.clone());
        entry.total_files = Some(record.total_files);
        entry.total_lines = Some(record.total_lines);
        entry.shape_score = record.shape_score;
        entry.duration_ms = Some(duration_ms);
        if let Ok(mut log) = self.activity.lock() {
            log.write_entry(&entry);
        }
    }

    fn log_error(&self, project_id: &str, err: &ShapeError) {
        let mut entry = LogEntry::new(EventType::Error, Severity::Warning);
        entry.project_id = Some(project_id.to_string());
        entry.error_code = Some(err.code().to_string());
        entry.details = Some(err.to_string());
        if let Ok(mut log) = self.activity.lock() {
            log.write_entry(&entry);
        }
    }
}
