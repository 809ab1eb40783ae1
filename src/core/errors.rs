//! CSH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Coarse failure class exposed to transport layers.
///
/// Every [`ShapeError`] variant maps onto exactly one class, so a thin
/// HTTP/CLI binding can pick a status code without matching variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    InvalidInput,
    Internal,
}

/// Top-level error type for codeshape.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("[CSH-1001] path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("[CSH-1002] not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("[CSH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CSH-1004] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CSH-1005] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CSH-1101] no analysis history for project {project_id}")]
    HistoryNotFound { project_id: String },

    #[error("[CSH-2001] scan failure under {path}: {details}")]
    Scan { path: PathBuf, details: String },

    #[error("[CSH-2002] corrupt analysis record at {path}: {details}")]
    CorruptRecord { path: PathBuf, details: String },

    #[error("[CSH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CSH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ShapeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PathNotFound { .. } => "CSH-1001",
            Self::NotADirectory { .. } => "CSH-1002",
            Self::ConfigParse { .. } => "CSH-1003",
            Self::InvalidConfig { .. } => "CSH-1004",
            Self::MissingConfig { .. } => "CSH-1005",
            Self::HistoryNotFound { .. } => "CSH-1101",
            Self::Scan { .. } => "CSH-2001",
            Self::CorruptRecord { .. } => "CSH-2002",
            Self::Serialization { .. } => "CSH-2101",
            Self::Io { .. } => "CSH-3002",
        }
    }

    /// Failure class for transport bindings (404 / 400 / 500 split).
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::PathNotFound { .. } | Self::HistoryNotFound { .. } | Self::MissingConfig { .. } => {
                ErrorClass::NotFound
            }
            Self::NotADirectory { .. } | Self::ConfigParse { .. } | Self::InvalidConfig { .. } => {
                ErrorClass::InvalidInput
            }
            Self::Scan { .. }
            | Self::CorruptRecord { .. }
            | Self::Serialization { .. }
            | Self::Io { .. } => ErrorClass::Internal,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ShapeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShapeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
