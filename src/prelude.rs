//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use codeshape::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{ErrorClass, Result, ShapeError};

// Scanner
pub use crate::scanner::patterns::{default_ignore_patterns, effective_patterns, should_ignore};
pub use crate::scanner::walker::Scanner;

// Scoring
pub use crate::scoring::{average_lines, shape_score};

// Store
pub use crate::store::disk::AnalysisStore;
pub use crate::store::records::{
    AnalysisRecord, FileEntry, ProjectMetadata, ProjectSettings, project_id,
};

// Service
pub use crate::service::{AnalysisService, AnalyzeRequest};
