//! SQLite adapter: Implementation of KeyValueStore.
//!
//! Provides local persistence for history partitions and the migration
//! record in a single `kv_store` table.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex surfaces as
//! `StorageError::LockPoisoned` rather than a panic.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::ports::KeyValueStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// SQLite key-value storage adapter.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) a store at the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    type Error = StorageError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let conn = self.lock()?;

        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, now],
        )?;

        tracing::debug!(bytes = value.len(), "Stored value for {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let storage = SqliteKeyValueStore::in_memory().expect("Should create db");

        assert!(storage.get("a").expect("Should read").is_none());

        storage.set("a", "1").expect("Should write");
        assert_eq!(storage.get("a").expect("Should read").as_deref(), Some("1"));

        // Overwrite replaces
        storage.set("a", "2").expect("Should write");
        assert_eq!(storage.get("a").expect("Should read").as_deref(), Some("2"));

        storage.remove("a").expect("Should remove");
        assert!(storage.get("a").expect("Should read").is_none());

        // Removing again is a no-op
        storage.remove("a").expect("Should remove");
    }

    #[test]
    fn test_keys_listing() {
        let storage = SqliteKeyValueStore::in_memory().expect("Should create db");
        storage.set("b", "x").expect("Should write");
        storage.set("a", "y").expect("Should write");

        assert_eq!(storage.keys().expect("Should list"), vec!["a", "b"]);
    }

    #[test]
    fn test_file_backed_persistence() {
        let path = std::env::temp_dir().join(format!(
            "neurotriage-kv-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        {
            let storage = SqliteKeyValueStore::new(&path).expect("Should open db");
            storage.set("k", "v").expect("Should write");
        }

        let reopened = SqliteKeyValueStore::new(&path).expect("Should reopen db");
        assert_eq!(reopened.get("k").expect("Should read").as_deref(), Some("v"));

        let _ = std::fs::remove_file(&path);
    }
}
