//! Prediction record types.
//!
//! Represents the output of the remote brain MRI classifier and the
//! history entries built from it.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Diagnostic class returned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PredictionClass {
    /// Normal scan, no disease indicators
    Control,
    /// Alzheimer's disease
    Alzheimer,
    /// Parkinson's disease
    Parkinson,
}

impl PredictionClass {
    /// All classes in dashboard order.
    pub const ALL: [PredictionClass; 3] = [Self::Control, Self::Alzheimer, Self::Parkinson];

    /// Wire code (`CONTROL`, `ALZHEIMER`, `PARKINSON`).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Control => "CONTROL",
            Self::Alzheimer => "ALZHEIMER",
            Self::Parkinson => "PARKINSON",
        }
    }

    /// Full display name used on the dashboard.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Control => "Normal/Control Cases",
            Self::Alzheimer => "Alzheimer's Disease",
            Self::Parkinson => "Parkinson's Disease",
        }
    }

    /// Parse a wire code, case-insensitively.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CONTROL" => Some(Self::Control),
            "ALZHEIMER" => Some(Self::Alzheimer),
            "PARKINSON" => Some(Self::Parkinson),
            _ => None,
        }
    }
}

impl std::fmt::Display for PredictionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Reads a class field that may be missing, null, or an unrecognised code.
/// Anything other than a known code becomes `None`.
fn lenient_class<'de, D>(deserializer: D) -> Result<Option<PredictionClass>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(PredictionClass::from_code))
}

/// Per-class confidences, each in `[0, 100]`.
///
/// These are independent model outputs and need not sum to 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    #[serde(default)]
    pub control: f64,
    #[serde(default)]
    pub alzheimer: f64,
    #[serde(default)]
    pub parkinson: f64,
}

impl ConfidenceBreakdown {
    /// Confidence for one class.
    #[must_use]
    pub fn get(&self, class: PredictionClass) -> f64 {
        match class {
            PredictionClass::Control => self.control,
            PredictionClass::Alzheimer => self.alzheimer,
            PredictionClass::Parkinson => self.parkinson,
        }
    }
}

/// Response body of the remote inference API for one uploaded image.
///
/// No field is required. Missing values pass through as absent, and an
/// unrecognised class code is treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(default, deserialize_with = "lenient_class", skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionClass>,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub recommendation: Option<String>,

    #[serde(default)]
    pub confidence: Option<ConfidenceBreakdown>,

    #[serde(default)]
    pub primary_confidence: Option<f64>,
}

impl ClassificationResult {
    /// Create a result carrying only a class and its primary confidence.
    #[must_use]
    pub fn new(prediction: PredictionClass, primary_confidence: f64) -> Self {
        Self {
            prediction: Some(prediction),
            full_name: Some(prediction.display_name().to_string()),
            description: None,
            recommendation: None,
            confidence: None,
            primary_confidence: Some(primary_confidence),
        }
    }

    /// Parse a response body.
    ///
    /// # Errors
    /// Returns error if the body is not a JSON object.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Whether the record is a normal scan or a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Normal,
    Disease,
}

impl From<Option<PredictionClass>> for RecordKind {
    /// Anything but a CONTROL result is filed as a disease record.
    fn from(class: Option<PredictionClass>) -> Self {
        match class {
            Some(PredictionClass::Control) => Self::Normal,
            _ => Self::Disease,
        }
    }
}

/// Processing status of a record. Records are only ever stored once complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Completed,
}

/// One completed analysis in a user's history.
///
/// Field names follow the persisted camelCase layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    /// Canonical identifier, derived from creation time in milliseconds
    pub id: u64,

    /// Display label `P-<year>-<seq>`; not unique
    pub patient_id: String,

    /// `None` when the classifier returned no recognised class
    #[serde(
        rename = "prediction",
        default,
        deserialize_with = "lenient_class",
        skip_serializing_if = "Option::is_none"
    )]
    pub prediction_class: Option<PredictionClass>,

    /// Human-readable class name as returned by the classifier
    #[serde(rename = "result", default)]
    pub result_label: Option<String>,

    /// Primary confidence in `[0, 100]`
    #[serde(default)]
    pub confidence: Option<f64>,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: RecordKind,

    #[serde(default)]
    pub detailed_confidence: Option<ConfidenceBreakdown>,

    #[serde(default)]
    pub recommendation: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_kind() -> RecordKind {
    RecordKind::Disease
}

impl PredictionRecord {
    /// Build a record from a classifier response.
    ///
    /// `seq` is the 1-based position the record takes in its list.
    #[must_use]
    pub fn from_result(
        id: u64,
        seq: usize,
        result: ClassificationResult,
        filename: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id: patient_label(timestamp.year(), seq),
            prediction_class: result.prediction,
            result_label: result.full_name,
            confidence: result.primary_confidence,
            timestamp,
            filename: filename.into(),
            status: RecordStatus::Completed,
            kind: RecordKind::from(result.prediction),
            detailed_confidence: result.confidence,
            recommendation: result.recommendation,
            description: result.description,
        }
    }

    /// Whether the record counts towards the detection rate (class is not CONTROL).
    #[must_use]
    pub fn is_detection(&self) -> bool {
        self.prediction_class != Some(PredictionClass::Control)
    }

    /// Result label, falling back to the class display name.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.result_label
            .as_deref()
            .or_else(|| self.prediction_class.map(|c| c.display_name()))
            .unwrap_or("Unknown")
    }
}

/// Format the `P-<year>-<seq>` display label, `seq` zero-padded to 3 digits.
#[must_use]
pub fn patient_label(year: i32, seq: usize) -> String {
    format!("P-{year}-{seq:03}")
}

/// Human-friendly age of a timestamp relative to `now`.
#[must_use]
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    let hours = minutes.div_euclid(60);
    let days = hours.div_euclid(24);

    fn plural(n: i64, unit: &str) -> String {
        if n > 1 {
            format!("{n} {unit}s ago")
        } else {
            format!("{n} {unit} ago")
        }
    }

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        timestamp.format("%m/%d/%Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("Valid instant")
    }

    #[test]
    fn test_patient_label_padding() {
        assert_eq!(patient_label(2025, 1), "P-2025-001");
        assert_eq!(patient_label(2025, 42), "P-2025-042");
        assert_eq!(patient_label(2025, 1234), "P-2025-1234");
    }

    #[test]
    fn test_record_from_result() {
        let mut result = ClassificationResult::new(PredictionClass::Parkinson, 88.5);
        result.recommendation = Some("Refer to neurology".to_string());

        let record = PredictionRecord::from_result(7, 3, result, "scan.png", at(2024, 5, 1, 9));

        assert_eq!(record.patient_id, "P-2024-003");
        assert_eq!(record.kind, RecordKind::Disease);
        assert_eq!(record.confidence, Some(88.5));
        assert_eq!(record.recommendation.as_deref(), Some("Refer to neurology"));
        assert_eq!(record.display_label(), "Parkinson's Disease");
    }

    #[test]
    fn test_result_missing_fields_pass_through() {
        let result = ClassificationResult::from_json(r#"{"prediction":"CONTROL"}"#)
            .expect("Should parse");
        assert_eq!(result.prediction, Some(PredictionClass::Control));
        assert!(result.full_name.is_none());
        assert!(result.primary_confidence.is_none());

        let record = PredictionRecord::from_result(1, 1, result, "a.png", at(2024, 1, 1, 0));
        assert!(record.confidence.is_none());
        assert_eq!(record.display_label(), "Normal/Control Cases");
    }

    #[test]
    fn test_result_without_class_kept_as_absent() {
        let missing = ClassificationResult::from_json(r#"{"full_name":"x","primary_confidence":40.0}"#)
            .expect("Should parse");
        assert!(missing.prediction.is_none());
        assert_eq!(missing.primary_confidence, Some(40.0));

        let unknown = ClassificationResult::from_json(r#"{"prediction":"GLIOMA"}"#)
            .expect("Should parse");
        assert!(unknown.prediction.is_none());

        let record = PredictionRecord::from_result(1, 1, unknown, "g.png", at(2024, 1, 1, 0));
        assert!(record.prediction_class.is_none());
        assert_eq!(record.kind, RecordKind::Disease);
        assert!(record.is_detection());
        assert_eq!(record.display_label(), "Unknown");

        let json = serde_json::to_value(&record).expect("Should serialize");
        assert!(json.get("prediction").is_none());

        assert!(ClassificationResult::from_json("not json").is_err());
    }

    #[test]
    fn test_record_json_layout() {
        let result = ClassificationResult::from_json(
            r#"{
                "prediction": "ALZHEIMER",
                "full_name": "Alzheimer's Disease",
                "description": "d",
                "recommendation": "r",
                "confidence": {"control": 10.0, "alzheimer": 80.0, "parkinson": 5.0},
                "primary_confidence": 80.0
            }"#,
        )
        .expect("Should parse");
        let record = PredictionRecord::from_result(1, 1, result, "mri.jpg", at(2024, 1, 1, 0));
        let json = serde_json::to_value(&record).expect("Should serialize");

        assert_eq!(json["patientId"], "P-2024-001");
        assert_eq!(json["prediction"], "ALZHEIMER");
        assert_eq!(json["result"], "Alzheimer's Disease");
        assert_eq!(json["type"], "disease");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["detailedConfidence"]["alzheimer"], 80.0);
    }

    #[test]
    fn test_format_relative() {
        let now = at(2024, 6, 10, 12);
        assert_eq!(format_relative(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(format_relative(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(format_relative(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_relative(now - Duration::days(8), now), "06/02/2024");
    }
}
