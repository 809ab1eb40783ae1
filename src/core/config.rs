//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShapeError};

/// Env var overriding the storage root.
pub const ENV_DATA_DIR: &str = "CODESHAPE_DATA_DIR";
/// Env var pointing at an alternate config file.
pub const ENV_CONFIG: &str = "CODESHAPE_CONFIG";

/// Full codeshape configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub scanner: ScannerConfig,
    pub scoring: ScoringConfig,
}

/// Where persisted analyses live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all per-project state. One subdirectory per
    /// project id.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("codeshape_data"),
        }
    }
}

/// Scanner traversal knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Directory recursion bound; subtrees deeper than this are skipped.
    pub max_depth: usize,
    /// Worker threads used for the walk + line counting.
    pub parallelism: usize,
    /// Whether to follow symlinked entries. Off by default to avoid cycles.
    pub follow_symlinks: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
            follow_symlinks: false,
        }
    }
}

/// Shape-score knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Line-count threshold used for projects with no stored settings.
    pub default_threshold: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_threshold: 100,
        }
    }
}

impl Config {
    /// Load configuration with the usual precedence:
    /// explicit path > `CODESHAPE_CONFIG` > `./codeshape.toml` > defaults.
    ///
    /// An explicitly requested file that does not exist is an error; the
    /// implicit candidates fall back to defaults silently.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.map(Path::to_path_buf).or_else(|| {
            env::var(ENV_CONFIG).ok().map(PathBuf::from)
        });

        let mut cfg = match explicit {
            Some(p) if p.exists() => Self::from_file(&p)?,
            Some(p) => return Err(ShapeError::MissingConfig { path: p }),
            None => {
                let candidate = Self::default_path();
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ShapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Default config file location (working directory).
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from("codeshape.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(ENV_DATA_DIR)
            && !dir.is_empty()
        {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    /// Reject configurations that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        if self.scanner.parallelism == 0 {
            return Err(ShapeError::InvalidConfig {
                details: "scanner.parallelism must be at least 1".to_string(),
            });
        }
        if self.scanner.max_depth == 0 {
            return Err(ShapeError::InvalidConfig {
                details: "scanner.max_depth must be at least 1".to_string(),
            });
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ShapeError::InvalidConfig {
                details: "storage.data_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.scoring.default_threshold, 100);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("codeshape_data"));
        assert!(!cfg.scanner.follow_symlinks);
        assert!(cfg.scanner.parallelism >= 1);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/codeshape"

            [scoring]
            default_threshold = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.data_dir, PathBuf::from("/var/lib/codeshape"));
        assert_eq!(cfg.scoring.default_threshold, 250);
        // Untouched section keeps its defaults.
        assert_eq!(cfg.scanner.max_depth, 64);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let mut cfg = Config::default();
        cfg.scanner.parallelism = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "CSH-1004");
        assert!(err.to_string().contains("parallelism"));
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent/codeshape/config.toml"))).unwrap_err();
        assert!(matches!(err, ShapeError::MissingConfig { .. }));
    }

    #[test]
    fn load_from_explicit_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("codeshape.toml");
        fs::write(&path, "[scanner]\nmax_depth = 7\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.scanner.max_depth, 7);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("codeshape.toml");
        fs::write(&path, "= not toml").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code(), "CSH-1003");
    }
}
