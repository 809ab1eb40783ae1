//! Parallel directory walker with streaming per-file line counting.
//!
//! The walker is the performance-sensitive path for large trees: worker
//! threads pull directories from a shared work queue, apply the ignore
//! rules, and count newline-delimited records per surviving file without
//! ever buffering whole files. Counting operates on raw bytes, so
//! undecodable content can never fail a scan; unreadable files are logged
//! and treated as empty.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use memchr::memchr_iter;

use crate::core::config::ScannerConfig;
use crate::core::errors::{Result, ShapeError};
use crate::scanner::patterns::should_ignore;
use crate::store::records::FileEntry;

/// Item in the internal work queue: (directory_path, depth).
type WorkItem = (PathBuf, usize);

/// Directory-tree scanner producing a ranked file listing.
///
/// Invariants on the output:
/// - zero-line files never appear
/// - sorted by line count descending, relative path ascending on ties
/// - symlinked entries are skipped unless `follow_symlinks` is set
pub struct Scanner {
    root: PathBuf,
    patterns: Arc<Vec<String>>,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            patterns: Arc::new(patterns),
            config: ScannerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Walk the tree and return the ranked listing.
    ///
    /// Unreadable subdirectories and files encountered mid-walk are skipped
    /// with a warning; only a root that cannot be opened at all is an error.
    pub fn scan(&self) -> Result<Vec<FileEntry>> {
        let meta = fs::metadata(&self.root).map_err(|err| ShapeError::Scan {
            path: self.root.clone(),
            details: err.to_string(),
        })?;
        if !meta.is_dir() {
            return Err(ShapeError::Scan {
                path: self.root.clone(),
                details: "scan root is not a directory".to_string(),
            });
        }

        let parallelism = self.config.parallelism.max(1);
        let (work_tx, work_rx) = channel::unbounded::<WorkItem>();
        let (result_tx, result_rx) = channel::unbounded::<FileEntry>();

        // Track in-flight directories so workers know when to stop.
        let in_flight = Arc::new(AtomicUsize::new(1));
        let root = Arc::new(self.root.clone());
        work_tx
            .send((self.root.clone(), 0))
            .map_err(|_| ShapeError::Scan {
                path: self.root.clone(),
                details: "work channel closed before walk started".to_string(),
            })?;

        let mut handles = Vec::with_capacity(parallelism);
        for _ in 0..parallelism {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let result_tx = result_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let root = Arc::clone(&root);
            let patterns = Arc::clone(&self.patterns);
            let config = self.config.clone();

            handles.push(thread::spawn(move || {
                walker_thread(&work_rx, &work_tx, &result_tx, &in_flight, &root, &patterns, &config);
            }));
        }
        // Drop our ends so the channels close once workers finish.
        drop(work_tx);
        drop(result_tx);

        let mut files: Vec<FileEntry> = result_rx.into_iter().collect();
        for handle in handles {
            let _ = handle.join();
        }

        files.sort_by(|a, b| b.lines.cmp(&a.lines).then_with(|| a.path.cmp(&b.path)));
        Ok(files)
    }
}

/// Worker loop: pull directories, process them, enqueue subdirectories.
fn walker_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileEntry>,
    in_flight: &AtomicUsize,
    root: &Path,
    patterns: &[String],
    config: &ScannerConfig,
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(20)) {
            Ok((dir_path, depth)) => {
                process_directory(
                    &dir_path, depth, work_tx, result_tx, in_flight, root, patterns, config,
                );
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Process one directory: count surviving files, enqueue child directories.
#[allow(clippy::too_many_arguments)]
fn process_directory(
    dir_path: &Path,
    depth: usize,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileEntry>,
    in_flight: &AtomicUsize,
    root: &Path,
    patterns: &[String],
    config: &ScannerConfig,
) {
    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            warn(dir_path, &err);
            return;
        }
        Err(err) if err.kind() == ErrorKind::NotFound => return,
        Err(err) => {
            warn(dir_path, &err);
            return;
        }
    };

    for entry_result in entries {
        let Ok(entry) = entry_result else {
            continue;
        };
        let child_path = entry.path();

        // file_type() is usually free (cached in the directory entry).
        let Ok(ft) = entry.file_type() else {
            continue;
        };

        if ft.is_symlink() {
            if !config.follow_symlinks {
                continue;
            }
            // Resolve the target to decide whether to recurse.
            let Ok(target_meta) = fs::metadata(&child_path) else {
                continue;
            };
            if target_meta.is_dir() {
                enqueue_child(child_path, depth, work_tx, in_flight, config);
            } else if target_meta.is_file() {
                emit_file(&child_path, root, patterns, result_tx);
            }
            continue;
        }

        if ft.is_dir() {
            enqueue_child(child_path, depth, work_tx, in_flight, config);
        } else if ft.is_file() {
            emit_file(&child_path, root, patterns, result_tx);
        }
    }
}

fn enqueue_child(
    child_path: PathBuf,
    depth: usize,
    work_tx: &channel::Sender<WorkItem>,
    in_flight: &AtomicUsize,
    config: &ScannerConfig,
) {
    if depth + 1 > config.max_depth {
        return;
    }
    in_flight.fetch_add(1, Ordering::Release);
    if work_tx.send((child_path, depth + 1)).is_err() {
        in_flight.fetch_sub(1, Ordering::Release);
    }
}

/// Apply ignore rules and line counting to one regular file, emitting a
/// `FileEntry` when it survives both.
fn emit_file(
    path: &Path,
    root: &Path,
    patterns: &[String],
    result_tx: &channel::Sender<FileEntry>,
) {
    let Ok(relative) = path.strip_prefix(root) else {
        return;
    };
    if should_ignore(relative, patterns) {
        return;
    }

    let lines = match count_lines(path) {
        Ok(n) => n,
        Err(err) => {
            warn(path, &err);
            0
        }
    };
    // Empty (or unreadable) files carry no shape information.
    if lines == 0 {
        return;
    }

    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let _ = result_tx.send(FileEntry {
        path: relative.to_string_lossy().into_owned(),
        name,
        lines,
    });
}

/// Count newline-delimited records by streaming the file in chunks.
///
/// A trailing record without a final newline still counts, matching the
/// usual "lines in a text file" expectation. Operating on bytes makes the
/// count insensitive to encoding problems.
pub fn count_lines(path: &Path) -> std::io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    let mut lines: u64 = 0;
    let mut seen_any = false;
    let mut last = b'\n';

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        seen_any = true;
        lines += memchr_iter(b'\n', &buf[..n]).count() as u64;
        last = buf[n - 1];
    }

    if seen_any && last != b'\n' {
        lines += 1;
    }
    Ok(lines)
}

fn warn(path: &Path, err: &std::io::Error) {
    eprintln!(
        "[CODESHAPE-SCAN] warning: could not read {}: {err}",
        path.display()
    );
}
