#![forbid(unsafe_code)]

//! codeshape — codebase shape analyzer with versioned per-project history.
//!
//! Walks a project tree, counts lines per file (ignore rules applied),
//! reduces the listing to a single composite "shape score" that punishes
//! oversized files quadratically, and persists each run as an immutable
//! JSON snapshot so history/latest/list queries can be served later.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use codeshape::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use codeshape::scanner::walker::Scanner;
//! use codeshape::store::disk::AnalysisStore;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
pub mod scoring;
pub mod service;
pub mod store;
