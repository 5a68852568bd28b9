//! Core data models for the timesheet predictor

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 12;

/// Canonical feature order. Must match the order the classifier was fit on.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "day_of_week_encoded",
    "hour_of_day",
    "month",
    "is_month_end",
    "activity_frequency",
    "avg_duration",
    "duration_consistency",
    "recent_trend",
    "total_occurrences",
    "is_billable",
    "activity_id",
    "user_id_encoded",
];

/// Mapping of user ids to the integer codes used at training time
pub type UserIdMapping = HashMap<String, i64>;

/// One past timesheet entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub activity_id: i64,
    #[serde(deserialize_with = "lenient::date")]
    pub log_date: NaiveDate,
    #[serde(deserialize_with = "lenient::hours")]
    pub total_hours: f64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_billable: bool,
    #[serde(default, deserialize_with = "lenient::text")]
    pub activity_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub activity_code: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub start_time: Option<String>,
}

/// A (user, activity, date) triple submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    pub user_id: String,
    pub activity_id: i64,
    pub target_date: NaiveDate,
    /// Time of day the activity would start; `None` means the 9 o'clock default
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
}

impl PredictionCandidate {
    pub fn new(user_id: impl Into<String>, activity_id: i64, target_date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            activity_id,
            target_date,
            start_time: None,
        }
    }

    pub fn with_start_time(mut self, start_time: NaiveTime) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

/// Feature vector for ML inference, fields in canonical order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub day_of_week_encoded: u32,
    pub hour_of_day: u32,
    pub month: u32,
    pub is_month_end: u8,
    pub activity_frequency: f64,
    pub avg_duration: f64,
    pub duration_consistency: f64,
    pub recent_trend: f64,
    pub total_occurrences: u32,
    pub is_billable: u8,
    pub activity_id: i64,
    pub user_id_encoded: i64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order
    pub fn values(&self) -> [f64; NUM_FEATURES] {
        [
            self.day_of_week_encoded as f64,
            self.hour_of_day as f64,
            self.month as f64,
            self.is_month_end as f64,
            self.activity_frequency,
            self.avg_duration,
            self.duration_consistency,
            self.recent_trend,
            self.total_occurrences as f64,
            self.is_billable as f64,
            self.activity_id as f64,
            self.user_id_encoded as f64,
        ]
    }

    /// Classifier input row; tree ensembles evaluate on single precision
    pub fn to_f32_row(&self) -> [f32; NUM_FEATURES] {
        self.values().map(|v| v as f32)
    }
}

/// Class label and positive-class probability for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: u8,
    pub probability: f64,
}

/// Batch output: a candidate paired with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: PredictionCandidate,
    pub label: u8,
    pub probability: f64,
}

/// One predicted timesheet line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub activity_id: i64,
    pub activity_name: String,
    pub activity_code: String,
    pub is_billable: bool,
    pub predicted_duration: f64,
    pub confidence: f64,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
}

/// Diagnostic description of the loaded classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub n_estimators: Option<u32>,
    pub max_depth: Option<u32>,
    pub n_features: usize,
    pub feature_names: Vec<String>,
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Deserializers for the loosely typed rows a database export produces
/// (decimal columns as strings, booleans as 0/1, datetimes for dates).
mod lenient {
    use chrono::NaiveDate;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string, got {}", describe(&other)))),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_text(d)?.unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(D::Error::custom(format!("expected text, got {}", describe(&other)))),
        }
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| D::Error::custom(format!("expected integer, got {}", n))),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected integer, got {:?}", s))),
            other => Err(D::Error::custom(format!("expected integer, got {}", describe(&other)))),
        }
    }

    pub fn hours<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let hours = match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("expected number, got {}", n)))?,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected number, got {:?}", s)))?,
            other => {
                return Err(D::Error::custom(format!("expected number, got {}", describe(&other))))
            }
        };
        if !hours.is_finite() || hours < 0.0 {
            return Err(D::Error::custom(format!("total_hours must be non-negative, got {}", hours)));
        }
        Ok(hours)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" | "" => Ok(false),
                _ => Err(D::Error::custom(format!("expected boolean, got {:?}", s))),
            },
            other => Err(D::Error::custom(format!("expected boolean, got {}", describe(&other)))),
        }
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        let trimmed = raw.trim();
        // "2026-02-18" or "2026-02-18T00:00:00.000Z"
        let date_part = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("invalid log_date {:?}: {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_database_export() {
        let record: HistoricalRecord = serde_json::from_value(json!({
            "tlog_id": 91,
            "user_id": 17,
            "activity_id": "4",
            "log_date": "2026-02-16T00:00:00.000Z",
            "total_hours": "7.50",
            "is_billable": 1,
            "activity_name": "Client Support",
            "activity_code": "CS-01",
            "start_time": "Mon Feb 16 2026 08:30:00 GMT+0800",
            "end_time": null
        }))
        .unwrap();

        assert_eq!(record.user_id, "17");
        assert_eq!(record.activity_id, 4);
        assert_eq!(record.log_date, NaiveDate::from_ymd_opt(2026, 2, 16).unwrap());
        assert_eq!(record.total_hours, 7.5);
        assert!(record.is_billable);
        assert!(record.start_time.is_some());
    }

    #[test]
    fn test_record_optional_fields_default() {
        let record: HistoricalRecord = serde_json::from_value(json!({
            "user_id": "u1",
            "activity_id": 2,
            "log_date": "2026-02-16",
            "total_hours": 3
        }))
        .unwrap();

        assert!(!record.is_billable);
        assert_eq!(record.activity_name, "");
        assert_eq!(record.activity_code, "");
        assert_eq!(record.start_time, None);
    }

    #[test]
    fn test_record_rejects_negative_hours() {
        let result = serde_json::from_value::<HistoricalRecord>(json!({
            "user_id": "u1",
            "activity_id": 2,
            "log_date": "2026-02-16",
            "total_hours": -1.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_record_rejects_bad_date() {
        let result = serde_json::from_value::<HistoricalRecord>(json!({
            "user_id": "u1",
            "activity_id": 2,
            "log_date": "16/02/2026",
            "total_hours": 1.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_vector_serializes_in_canonical_order() {
        let vector = FeatureVector {
            day_of_week_encoded: 0,
            hour_of_day: 9,
            month: 2,
            is_month_end: 0,
            activity_frequency: 1.0,
            avg_duration: 5.0,
            duration_consistency: 0.7172,
            recent_trend: 0.0,
            total_occurrences: 2,
            is_billable: 1,
            activity_id: 7,
            user_id_encoded: 0,
        };

        let json = serde_json::to_string(&vector).unwrap();
        let mut last = 0;
        for name in FEATURE_NAMES {
            let pos = json.find(&format!("\"{}\"", name)).unwrap();
            assert!(pos >= last, "{} out of order", name);
            last = pos;
        }
        assert_eq!(vector.values()[5], 5.0);
        assert_eq!(vector.values()[10], 7.0);
    }

    #[test]
    fn test_prediction_result_date_format() {
        let result = PredictionResult {
            activity_id: 3,
            activity_name: "Activity 3".to_string(),
            activity_code: "ACT3".to_string(),
            is_billable: false,
            predicted_duration: 8.0,
            confidence: 0.91,
            date: NaiveDate::from_ymd_opt(2026, 2, 19).unwrap(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["date"], "2026-02-19");
    }
}
