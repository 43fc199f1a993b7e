//! Storage port: Trait for durable key-value storage.
//!
//! Models the per-installation string store the history lives in. All
//! partitions and the migration record share one store instance.

/// Trait for durable key-value storage.
///
/// Writes are synchronous and last-write-wins; there is no locking or
/// transaction support across callers.
pub trait KeyValueStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// `None` if the key is absent.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;

    /// List every key currently stored.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn keys(&self) -> Result<Vec<String>, Self::Error>;
}
