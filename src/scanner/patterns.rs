//! Ignore-rule matching: directory, extension, and substring pattern forms.
//!
//! Three shorthand forms, checked in order with first-match-wins OR:
//! - `name/` — matches when any path segment equals `name`
//! - `*.ext` — matches when the relative path ends with `.ext`
//! - anything else — matches when it appears in the base filename
//!
//! Matching is case-sensitive and exact; there is deliberately no glob
//! engine beyond the two shorthand forms.

use std::path::Path;

/// The three supported pattern forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind<'a> {
    /// `name/` — any path segment equals `name`.
    Directory(&'a str),
    /// `*.ext` — relative path ends with `.ext` (suffix includes the dot).
    Extension(&'a str),
    /// Plain token — substring of the base filename.
    Substring(&'a str),
}

/// Classify one raw pattern string into its matching form.
#[must_use]
pub fn classify(pattern: &str) -> PatternKind<'_> {
    if let Some(stripped) = pattern.strip_suffix('/') {
        PatternKind::Directory(stripped)
    } else if let Some(suffix) = pattern.strip_prefix('*')
        && pattern.starts_with("*.")
    {
        PatternKind::Extension(suffix)
    } else {
        PatternKind::Substring(pattern)
    }
}

/// Decide whether a relative file path is excluded by an ordered pattern set.
///
/// Pure and deterministic: same `(path, patterns)` always yields the same
/// answer. Returns `true` on the first matching pattern.
#[must_use]
pub fn should_ignore(relative_path: &Path, patterns: &[String]) -> bool {
    let path_str = relative_path.to_string_lossy();
    let file_name = relative_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    patterns.iter().any(|pattern| match classify(pattern) {
        PatternKind::Directory(dir) => {
            !dir.is_empty()
                && relative_path
                    .components()
                    .any(|c| c.as_os_str().to_string_lossy() == dir)
        }
        PatternKind::Extension(suffix) => path_str.ends_with(suffix),
        PatternKind::Substring(token) => !token.is_empty() && file_name.contains(token),
    })
}

/// Built-in ignore set applied to every scan before project-specific
/// patterns. Covers dependency trees, lockfiles, VCS/IDE state, build
/// artifacts, media, documentation, and local databases.
#[must_use]
pub fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

/// Merge the built-in defaults with project or caller extras, defaults first.
#[must_use]
pub fn effective_patterns(extras: &[String]) -> Vec<String> {
    let mut merged = default_ignore_patterns();
    merged.extend(extras.iter().cloned());
    merged
}

const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Package managers
    "node_modules/",
    "venv/",
    "env/",
    ".env",
    "__pycache__/",
    ".pytest_cache/",
    "dist/",
    "build/",
    ".next/",
    "out/",
    "coverage/",
    ".nyc_output/",
    // Config files
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
    // IDE and system
    ".git/",
    ".vscode/",
    ".idea/",
    ".DS_Store",
    "Thumbs.db",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    ".Python",
    "*.so",
    "*.dylib",
    "*.dll",
    // Build artifacts
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.d.ts",
    // Documentation
    "LICENSE",
    "README.md",
    "CHANGELOG.md",
    "*.md",
    // Media files
    "*.jpg",
    "*.jpeg",
    "*.png",
    "*.gif",
    "*.svg",
    "*.ico",
    "*.mp4",
    "*.mp3",
    "*.wav",
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    // Other
    "*.log",
    "*.sql",
    "*.sqlite",
    "*.db",
];
