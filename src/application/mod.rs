//! Application layer: Use cases and services.
//!
//! The history store drives persistence and keeps the aggregate metrics
//! current; the analytics functions are pure and usable on their own.

pub mod analytics;
mod history;
pub mod migration;

pub use analytics::{
    compute_disease_metrics, compute_summary, compute_windowed, DashboardMetrics,
};
pub use history::{
    BindingState, HistoryQuery, PredictionStore, SortOrder, DEFAULT_RECENT_LIMIT,
    HISTORY_CAPACITY,
};
pub use migration::{run_migrations, MigrationOutcome, MigrationRecord};
