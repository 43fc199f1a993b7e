//! Derived dashboard metrics.
//!
//! None of these types are persisted; they are rebuilt from the record list.

use std::str::FromStr;

use chrono::Duration;
use serde::Serialize;

use super::prediction::PredictionClass;

/// Reported model accuracy. A fixed placeholder, not derived from records.
pub const MODEL_ACCURACY: f64 = 95.8;

/// Reported processing time in seconds. A fixed placeholder.
pub const PROCESSING_TIME_SECS: f64 = 2.3;

/// Accuracy baseline the windowed view compares against.
pub const PREVIOUS_MODEL_ACCURACY: f64 = 93.7;

/// Processing time baseline the windowed view compares against.
pub const PREVIOUS_PROCESSING_TIME_SECS: f64 = 2.6;

/// Rolling statistics over a record list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_scans: usize,
    pub accuracy: f64,
    pub processing_time: f64,
    /// Percentage of records whose class is not CONTROL
    pub detection_rate: f64,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self {
            total_scans: 0,
            accuracy: MODEL_ACCURACY,
            processing_time: PROCESSING_TIME_SECS,
            detection_rate: 0.0,
        }
    }
}

/// Per-class breakdown shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseMetric {
    pub disease: &'static str,
    pub code: PredictionClass,
    pub total_cases: usize,
    /// Fixed per-class figure
    pub accuracy: f64,
    /// Mean primary confidence, 0 when there are no cases
    pub avg_confidence: f64,
    pub color: &'static str,
}

impl DiseaseMetric {
    /// Reported accuracy for a class.
    #[must_use]
    pub fn class_accuracy(class: PredictionClass) -> f64 {
        match class {
            PredictionClass::Control => 97.1,
            PredictionClass::Alzheimer => 96.2,
            PredictionClass::Parkinson => 95.4,
        }
    }

    /// Dashboard colour tag for a class.
    #[must_use]
    pub fn class_color(class: PredictionClass) -> &'static str {
        match class {
            PredictionClass::Control => "green",
            PredictionClass::Alzheimer => "blue",
            PredictionClass::Parkinson => "purple",
        }
    }

    /// Entry for a class with no cases.
    #[must_use]
    pub fn empty(class: PredictionClass) -> Self {
        Self {
            disease: class.display_name(),
            code: class,
            total_cases: 0,
            accuracy: Self::class_accuracy(class),
            avg_confidence: 0.0,
            color: Self::class_color(class),
        }
    }
}

/// Trailing time window selectable on the metrics page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Period {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl Period {
    pub const ALL: [Period; 4] = [Self::Day, Self::Week, Self::Month, Self::Quarter];

    /// Window length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Quarter => Duration::days(90),
        }
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    /// Parse a period key, falling back to `7d` for anything unrecognised.
    #[must_use]
    pub fn parse_or_default(key: &str) -> Self {
        key.parse().unwrap_or_default()
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key() == s.trim())
            .ok_or_else(|| format!("unknown period: {s}"))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Formatted change of each summary field against the previous window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricChanges {
    pub total_scans: String,
    pub accuracy: String,
    pub processing_time: String,
    pub detection_rate: String,
}

/// Metrics for one trailing window plus the equal-length window before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowedMetrics {
    pub period: Period,
    pub window_start: chrono::DateTime<chrono::Utc>,
    pub current: MetricsSummary,
    pub previous: MetricsSummary,
    pub change: MetricChanges,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parsing() {
        assert_eq!("24h".parse::<Period>(), Ok(Period::Day));
        assert_eq!("90d".parse::<Period>(), Ok(Period::Quarter));
        assert!("1y".parse::<Period>().is_err());
        assert_eq!(Period::parse_or_default("1y"), Period::Week);
        assert_eq!(Period::parse_or_default(""), Period::Week);
    }

    #[test]
    fn test_empty_disease_metric() {
        let metric = DiseaseMetric::empty(PredictionClass::Alzheimer);
        assert_eq!(metric.total_cases, 0);
        assert_eq!(metric.avg_confidence, 0.0);
        assert_eq!(metric.accuracy, 96.2);
        assert_eq!(metric.color, "blue");
    }
}
