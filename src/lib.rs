//! # neurotriage
//!
//! Prediction history and dashboard metrics for brain MRI triage.
//!
//! A remote classifier labels each uploaded scan as control, Alzheimer's or
//! Parkinson's. This crate keeps the per-user history of those results in
//! durable key-value storage and derives the figures the dashboard shows.
//!
//! ## Architecture
//!
//! - `domain`: Records, classes, identities and derived metric types
//! - `ports`: The key-value storage trait
//! - `adapters`: SQLite storage and log redaction
//! - `application`: The history store, metrics aggregation and migration
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{HistoryQuery, PredictionStore, SortOrder};
pub use domain::{ClassificationResult, Identity, PredictionClass, PredictionRecord};

/// Result type for neurotriage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Main error type for neurotriage
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
