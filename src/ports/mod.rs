//! Ports layer: Trait definitions for external operations.
//!
//! These traits define the boundary between the history logic and the
//! storage backend it persists to.

mod storage;

pub use storage::KeyValueStore;
