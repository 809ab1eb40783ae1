//! Persistence layer: typed analysis records and the on-disk store.

pub mod disk;
pub mod records;
