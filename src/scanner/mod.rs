//! Codebase scanner: ignore-rule matching and the parallel line-counting walker.

pub mod patterns;
pub mod walker;
