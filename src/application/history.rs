//! Prediction history store.
//!
//! Holds the newest-first list of records for the active identity, mirrors
//! every change to its storage partition, and keeps the dashboard metrics
//! in step with the list.
//!
//! # Lifecycle
//!
//! The store starts unbound (no identity, empty list, nothing persisted).
//! Binding an identity loads that identity's partition; signing out drops
//! the in-memory list and leaves storage untouched. Partitions are never
//! merged.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::analytics::{compute_windowed, DashboardMetrics};
use super::migration::run_migrations;
use crate::domain::{
    ClassificationResult, DiseaseMetric, Identity, MetricsSummary, PartitionKey, Period,
    PredictionClass, PredictionRecord, WindowedMetrics,
};
use crate::ports::KeyValueStore;
use crate::TriageError;

/// Maximum number of records kept per partition.
pub const HISTORY_CAPACITY: usize = 50;

/// Default size of the "recent analyses" list.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Which partition, if any, the store is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    NoIdentity,
    Bound(PartitionKey),
}

/// Ordering for history queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    /// Highest confidence first
    Confidence,
    /// Patient label, ascending
    PatientId,
    /// Keep list order
    Unsorted,
}

impl SortOrder {
    /// Parse a sort key. Unknown keys keep list order.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key.trim() {
            "newest" => Self::Newest,
            "oldest" => Self::Oldest,
            "confidence" => Self::Confidence,
            "patientId" | "patient" => Self::PatientId,
            _ => Self::Unsorted,
        }
    }
}

/// Search, filter and sort options for browsing the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Case-insensitive substring of patient label, result label or filename
    pub search: Option<String>,
    /// Restrict to one class
    pub class: Option<PredictionClass>,
    pub sort: SortOrder,
}

impl HistoryQuery {
    fn matches(&self, record: &PredictionRecord, needle: Option<&str>) -> bool {
        if self.class.is_some_and(|c| Some(c) != record.prediction_class) {
            return false;
        }
        let Some(needle) = needle else {
            return true;
        };
        record.patient_id.to_lowercase().contains(needle)
            || record.display_label().to_lowercase().contains(needle)
            || record.filename.to_lowercase().contains(needle)
    }

    /// Apply the query to a record slice.
    #[must_use]
    pub fn apply<'a>(&self, records: &'a [PredictionRecord]) -> Vec<&'a PredictionRecord> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut selected: Vec<&PredictionRecord> = records
            .iter()
            .filter(|r| self.matches(r, needle.as_deref()))
            .collect();

        match self.sort {
            SortOrder::Newest => selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::Oldest => selected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::Confidence => selected.sort_by(|a, b| {
                let a = a.confidence.unwrap_or(0.0);
                let b = b.confidence.unwrap_or(0.0);
                b.total_cmp(&a)
            }),
            SortOrder::PatientId => selected.sort_by(|a, b| a.patient_id.cmp(&b.patient_id)),
            SortOrder::Unsorted => {}
        }

        selected
    }
}

/// Per-identity prediction history backed by a key-value store.
pub struct PredictionStore<S>
where
    S: KeyValueStore,
{
    storage: Arc<S>,
    state: BindingState,
    records: Vec<PredictionRecord>,
    metrics: DashboardMetrics,
}

impl<S> PredictionStore<S>
where
    S: KeyValueStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Open the store, running the one-time partition migration first.
    ///
    /// # Errors
    /// Returns error if the migration cannot read or write storage.
    pub fn open(storage: Arc<S>) -> crate::Result<Self> {
        run_migrations(storage.as_ref(), Utc::now()).map_err(|e| TriageError::Storage(e.into()))?;

        Ok(Self {
            storage,
            state: BindingState::NoIdentity,
            records: Vec::new(),
            metrics: DashboardMetrics::default(),
        })
    }

    #[must_use]
    pub fn state(&self) -> &BindingState {
        &self.state
    }

    /// Current records, newest first.
    #[must_use]
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    #[must_use]
    pub fn summary(&self) -> &MetricsSummary {
        &self.metrics.summary
    }

    #[must_use]
    pub fn disease_metrics(&self) -> &[DiseaseMetric; 3] {
        &self.metrics.diseases
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardMetrics {
        &self.metrics
    }

    /// Read a partition's persisted list.
    ///
    /// Never fails: missing, unreadable or corrupted data yields an empty
    /// list, and the stored value is left as it is. Individual entries that
    /// cannot be read are skipped; the rest of the list is kept.
    #[must_use]
    pub fn load(&self, key: &PartitionKey) -> Vec<PredictionRecord> {
        let raw = match self.storage.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read history for {}: {}", key, e);
                return Vec::new();
            }
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Error loading prediction history for {}: {}", key, e);
                return Vec::new();
            }
        };

        let stored = entries.len();
        let mut records: Vec<PredictionRecord> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();

        if records.len() < stored {
            tracing::warn!(
                skipped = stored - records.len(),
                "Skipped unreadable entries in {}",
                key
            );
        }

        records.truncate(HISTORY_CAPACITY);
        records
    }

    /// Replace the in-memory list with the given partition's contents.
    pub fn switch_partition(&mut self, key: PartitionKey) {
        self.records = self.load(&key);
        tracing::info!(records = self.records.len(), "Switched history to {}", key);
        self.state = BindingState::Bound(key);
        self.recompute();
    }

    /// Bind the store to an identity's partition.
    pub fn bind(&mut self, identity: &Identity) {
        self.switch_partition(identity.partition_key());
    }

    /// Drop the in-memory list. Persisted partitions are kept.
    pub fn sign_out(&mut self) {
        self.state = BindingState::NoIdentity;
        self.records.clear();
        self.recompute();
        tracing::info!("History unbound");
    }

    /// Record a completed analysis stamped with the current time.
    ///
    /// # Errors
    /// Returns error only if persisting the updated list fails; the record
    /// is kept in memory either way.
    pub fn append(
        &mut self,
        result: ClassificationResult,
        filename: impl Into<String>,
    ) -> crate::Result<PredictionRecord> {
        self.append_at(result, filename, Utc::now())
    }

    /// Record a completed analysis created at `now`.
    ///
    /// # Errors
    /// See [`PredictionStore::append`].
    pub fn append_at(
        &mut self,
        result: ClassificationResult,
        filename: impl Into<String>,
        now: DateTime<Utc>,
    ) -> crate::Result<PredictionRecord> {
        let id = self.next_id(now);
        let seq = self.records.len() + 1;
        let record = PredictionRecord::from_result(id, seq, result, filename, now);

        self.records.insert(0, record.clone());
        self.records.truncate(HISTORY_CAPACITY);
        self.recompute();

        tracing::debug!(id, class = ?record.prediction_class, "Appended {}", record.patient_id);

        self.persist()?;
        Ok(record)
    }

    /// The first `n` records, newest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[PredictionRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Search and sort the current list.
    #[must_use]
    pub fn query(&self, query: &HistoryQuery) -> Vec<&PredictionRecord> {
        query.apply(&self.records)
    }

    /// Windowed comparison over the current list.
    #[must_use]
    pub fn windowed(&self, period: Period, now: DateTime<Utc>) -> WindowedMetrics {
        compute_windowed(&self.records, period, now)
    }

    /// Millisecond timestamp, bumped past the newest id so ids stay increasing.
    fn next_id(&self, now: DateTime<Utc>) -> u64 {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        match self.records.iter().map(|r| r.id).max() {
            Some(newest) if newest >= millis => newest.saturating_add(1),
            _ => millis,
        }
    }

    fn recompute(&mut self) {
        self.metrics = DashboardMetrics::from_records(&self.records);
    }

    fn persist(&self) -> crate::Result<()> {
        let BindingState::Bound(key) = &self.state else {
            return Ok(());
        };

        let json = serde_json::to_string(&self.records)?;
        self.storage
            .set(key.as_str(), &json)
            .map_err(|e| TriageError::Storage(e.into()))?;

        tracing::debug!(records = self.records.len(), "Persisted history to {}", key);
        Ok(())
    }
}
