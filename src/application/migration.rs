//! One-time storage migrations.
//!
//! Histories written before per-user partitioning could leak between
//! accounts, so the first run on a store wipes every legacy history key.
//! A versioned record marks the sweep as done; it never runs twice on the
//! same store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::KeyValueStore;

/// Storage key of the migration record.
pub const MIGRATION_KEY: &str = "schemaMigration";

/// Schema version established by the partition sweep.
pub const PARTITION_SCHEMA_VERSION: u32 = 3;

/// Flag written by older clients once they had performed the same sweep.
const LEGACY_DONE_FLAG: &str = "userIsolationReset_v3";

/// Key fragments identifying pre-partition data.
const LEGACY_KEY_FRAGMENTS: [&str; 3] = [
    "predictionHistory",
    "legacyDataMigrated",
    "predictionDataReset",
];

/// Persisted marker of the last completed migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub version: u32,
    pub completed_at: DateTime<Utc>,
}

/// What a migration run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The sweep ran and removed this many keys
    Applied { removed: usize },
    /// The store was already at the current version
    AlreadyApplied,
}

fn is_legacy_key(key: &str) -> bool {
    LEGACY_KEY_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

/// Read the migration record, if any.
///
/// A record that exists but cannot be parsed is reported as current so a
/// damaged marker never triggers a second sweep.
fn current_version<S: KeyValueStore>(storage: &S) -> Result<Option<u32>, S::Error> {
    let Some(raw) = storage.get(MIGRATION_KEY)? else {
        return Ok(None);
    };

    match serde_json::from_str::<MigrationRecord>(&raw) {
        Ok(record) => Ok(Some(record.version)),
        Err(e) => {
            tracing::warn!("Unreadable migration record, treating as current: {}", e);
            Ok(Some(PARTITION_SCHEMA_VERSION))
        }
    }
}

/// Run the partition sweep unless this store has already had it.
///
/// # Errors
/// Returns error if the storage backend fails.
pub fn run_migrations<S: KeyValueStore>(
    storage: &S,
    now: DateTime<Utc>,
) -> Result<MigrationOutcome, S::Error> {
    if current_version(storage)?.is_some_and(|v| v >= PARTITION_SCHEMA_VERSION) {
        return Ok(MigrationOutcome::AlreadyApplied);
    }

    let record = MigrationRecord {
        version: PARTITION_SCHEMA_VERSION,
        completed_at: now,
    };
    let record_json = serde_json::to_string(&record).unwrap_or_default();

    if storage.get(LEGACY_DONE_FLAG)?.as_deref() == Some("true") {
        storage.set(MIGRATION_KEY, &record_json)?;
        tracing::info!("Adopted legacy migration flag as version {}", PARTITION_SCHEMA_VERSION);
        return Ok(MigrationOutcome::AlreadyApplied);
    }

    let mut removed = 0;
    for key in storage.keys()? {
        if is_legacy_key(&key) {
            storage.remove(&key)?;
            removed += 1;
        }
    }

    storage.set(MIGRATION_KEY, &record_json)?;
    tracing::info!(
        removed,
        "Applied partition migration (version {})",
        PARTITION_SCHEMA_VERSION
    );

    Ok(MigrationOutcome::Applied { removed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteKeyValueStore;

    fn seeded_store() -> SqliteKeyValueStore {
        let storage = SqliteKeyValueStore::in_memory().expect("Should create db");
        storage.set("predictionHistory", "[]").expect("Should write");
        storage.set("predictionHistory_17", "[]").expect("Should write");
        storage.set("legacyDataMigrated", "true").expect("Should write");
        storage.set("predictionDataReset_v2", "true").expect("Should write");
        storage.set("authToken", "abc").expect("Should write");
        storage
    }

    #[test]
    fn test_sweep_removes_legacy_keys_only() {
        let storage = seeded_store();

        let outcome = run_migrations(&storage, Utc::now()).expect("Should migrate");
        assert_eq!(outcome, MigrationOutcome::Applied { removed: 4 });

        let keys = storage.keys().expect("Should list");
        assert_eq!(keys, vec!["authToken".to_string(), MIGRATION_KEY.to_string()]);
    }

    #[test]
    fn test_second_run_is_noop() {
        let storage = seeded_store();
        run_migrations(&storage, Utc::now()).expect("Should migrate");
        let after_first = storage.keys().expect("Should list");
        let record_first = storage.get(MIGRATION_KEY).expect("Should read");

        // Data written after the sweep must survive later runs.
        storage.set("predictionHistory_17", "[]").expect("Should write");

        let outcome = run_migrations(&storage, Utc::now()).expect("Should migrate");
        assert_eq!(outcome, MigrationOutcome::AlreadyApplied);
        assert!(storage.get("predictionHistory_17").expect("Should read").is_some());
        assert_eq!(storage.get(MIGRATION_KEY).expect("Should read"), record_first);
        assert_eq!(after_first.len() + 1, storage.keys().expect("Should list").len());
    }

    #[test]
    fn test_legacy_flag_skips_sweep() {
        let storage = seeded_store();
        storage.set(LEGACY_DONE_FLAG, "true").expect("Should write");

        let outcome = run_migrations(&storage, Utc::now()).expect("Should migrate");
        assert_eq!(outcome, MigrationOutcome::AlreadyApplied);
        assert!(storage.get("predictionHistory_17").expect("Should read").is_some());
        assert!(storage.get(MIGRATION_KEY).expect("Should read").is_some());
    }

    #[test]
    fn test_damaged_record_does_not_resweep() {
        let storage = seeded_store();
        storage.set(MIGRATION_KEY, "not json").expect("Should write");

        let outcome = run_migrations(&storage, Utc::now()).expect("Should migrate");
        assert_eq!(outcome, MigrationOutcome::AlreadyApplied);
        assert!(storage.get("predictionHistory_17").expect("Should read").is_some());
    }
}
