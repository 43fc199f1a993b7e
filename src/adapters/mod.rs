//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite-backed key-value storage
//! - `sanitize`: identifier redaction for logs

pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
