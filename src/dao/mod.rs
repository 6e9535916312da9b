//! Persistence layer.

/// Database model definitions.
pub mod models;
/// Persistence backends for races and entrants.
pub mod race_store;
/// Storage abstraction layer errors.
pub mod storage;
