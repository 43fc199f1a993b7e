//! Domain layer: Core business types.
//!
//! Plain data with serde support and no I/O.

mod identity;
mod metrics;
mod prediction;

pub use identity::{Identity, PartitionKey, HISTORY_KEY_PREFIX};
pub use metrics::{
    DiseaseMetric, MetricChanges, MetricsSummary, Period, WindowedMetrics, MODEL_ACCURACY,
    PREVIOUS_MODEL_ACCURACY, PREVIOUS_PROCESSING_TIME_SECS, PROCESSING_TIME_SECS,
};
pub use prediction::{
    format_relative, patient_label, ClassificationResult, ConfidenceBreakdown, PredictionClass,
    PredictionRecord, RecordKind, RecordStatus,
};
