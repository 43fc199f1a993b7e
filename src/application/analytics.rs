//! Metrics aggregation over a prediction history.
//!
//! Everything here is a pure function of the record slice: no storage, no
//! clock. Accuracy and processing time are reported constants; only counts,
//! detection rates and confidences are derived from records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    DiseaseMetric, MetricChanges, MetricsSummary, Period, PredictionClass, PredictionRecord,
    WindowedMetrics, MODEL_ACCURACY, PREVIOUS_MODEL_ACCURACY, PREVIOUS_PROCESSING_TIME_SECS,
    PROCESSING_TIME_SECS,
};

/// Summary and per-class breakdown, recomputed together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub summary: MetricsSummary,
    pub diseases: [DiseaseMetric; 3],
}

impl DashboardMetrics {
    #[must_use]
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        Self {
            summary: compute_summary(records),
            diseases: compute_disease_metrics(records),
        }
    }
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::from_records(&[])
    }
}

/// Percentage of records that are not CONTROL; 0 for an empty slice.
fn detection_rate<'a, I>(records: I) -> (usize, f64)
where
    I: IntoIterator<Item = &'a PredictionRecord>,
{
    let (total, detected) = records.into_iter().fold((0usize, 0usize), |(t, d), r| {
        (t + 1, d + usize::from(r.is_detection()))
    });

    let rate = if total > 0 {
        detected as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    (total, rate)
}

/// Rolling summary over the whole list.
#[must_use]
pub fn compute_summary(records: &[PredictionRecord]) -> MetricsSummary {
    let (total_scans, detection_rate) = detection_rate(records);

    MetricsSummary {
        total_scans,
        accuracy: MODEL_ACCURACY,
        processing_time: PROCESSING_TIME_SECS,
        detection_rate,
    }
}

/// Per-class case counts and mean confidence, always in
/// CONTROL, ALZHEIMER, PARKINSON order.
///
/// Records without a primary confidence count as cases but are left out of
/// the mean.
#[must_use]
pub fn compute_disease_metrics(records: &[PredictionRecord]) -> [DiseaseMetric; 3] {
    PredictionClass::ALL.map(|class| {
        let mut metric = DiseaseMetric::empty(class);
        let mut confidence_sum = 0.0;
        let mut confidence_count = 0usize;

        for record in records.iter().filter(|r| r.prediction_class == Some(class)) {
            metric.total_cases += 1;
            if let Some(confidence) = record.confidence {
                confidence_sum += confidence;
                confidence_count += 1;
            }
        }

        if confidence_count > 0 {
            metric.avg_confidence = confidence_sum / confidence_count as f64;
        }
        metric
    })
}

/// Relative change in percent, e.g. `+12.5%` or `-3.0%`.
///
/// A zero baseline always yields `+0%`.
#[must_use]
pub fn format_percent_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "+0%".to_string();
    }
    let change = (current - previous) / previous * 100.0;
    let sign = if change >= 0.0 { "+" } else { "" };
    format!("{sign}{change:.1}%")
}

/// Absolute change in seconds, e.g. `-0.3s`.
///
/// A zero baseline always yields `+0s`.
#[must_use]
pub fn format_time_change(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "+0s".to_string();
    }
    let diff = current - previous;
    let sign = if diff >= 0.0 { "+" } else { "" };
    format!("{sign}{diff:.1}s")
}

/// Metrics for the trailing `period` ending at `now`, compared with the
/// equal-length window immediately before it.
///
/// The current window is `[now - d, now]`, the previous one
/// `[now - 2d, now - d)`. Records stamped after `now` belong to neither.
#[must_use]
pub fn compute_windowed(
    records: &[PredictionRecord],
    period: Period,
    now: DateTime<Utc>,
) -> WindowedMetrics {
    let length = period.duration();
    let start = now - length;
    let previous_start = start - length;

    let (total_scans, rate) = detection_rate(
        records
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= now),
    );
    let (previous_total, previous_rate) = detection_rate(
        records
            .iter()
            .filter(|r| r.timestamp >= previous_start && r.timestamp < start),
    );

    let current = MetricsSummary {
        total_scans,
        accuracy: MODEL_ACCURACY,
        processing_time: PROCESSING_TIME_SECS,
        detection_rate: rate,
    };
    let previous = MetricsSummary {
        total_scans: previous_total,
        accuracy: PREVIOUS_MODEL_ACCURACY,
        processing_time: PREVIOUS_PROCESSING_TIME_SECS,
        detection_rate: previous_rate,
    };

    let change = MetricChanges {
        total_scans: format_percent_change(total_scans as f64, previous_total as f64),
        accuracy: format_percent_change(current.accuracy, previous.accuracy),
        processing_time: format_time_change(current.processing_time, previous.processing_time),
        detection_rate: format_percent_change(current.detection_rate, previous.detection_rate),
    };

    WindowedMetrics {
        period,
        window_start: start,
        current,
        previous,
        change,
    }
}
