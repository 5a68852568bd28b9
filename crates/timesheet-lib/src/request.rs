//! Boundary contract with the process that invokes the predictor
//!
//! The caller sends history as loosely typed JSON rows. Each row is decoded
//! on its own so that one unusable row is dropped instead of failing the
//! whole request.

use crate::error::RequestError;
use crate::models::{HistoricalRecord, UserIdMapping};
use crate::predictor::DEFAULT_CONFIDENCE_THRESHOLD;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Daily prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub user_id: String,
    /// `YYYY-MM-DD`
    pub target_date: String,
    #[serde(default)]
    pub historical_data: Vec<serde_json::Value>,
    #[serde(default)]
    pub all_activities: Vec<i64>,
    /// Falls back to the caller's default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id_mapping: Option<UserIdMapping>,
}

/// History rows that decoded, plus a count of those that did not
#[derive(Debug, Clone, Default)]
pub struct HistoryLoad {
    pub records: Vec<HistoricalRecord>,
    pub rejected: usize,
}

impl PredictionRequest {
    pub fn from_json(raw: &str) -> Result<Self, RequestError> {
        let request: Self = serde_json::from_str(raw)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.user_id.trim().is_empty() {
            return Err(RequestError::MissingUserId);
        }
        self.target_date()?;
        if let Some(threshold) = self.confidence_threshold {
            if !threshold.is_finite() {
                return Err(RequestError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }

    /// Requested threshold, or `DEFAULT_CONFIDENCE_THRESHOLD`
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn confidence_threshold_or(&self, default: f64) -> f64 {
        self.confidence_threshold.unwrap_or(default)
    }

    pub fn target_date(&self) -> Result<NaiveDate, RequestError> {
        NaiveDate::parse_from_str(self.target_date.trim(), "%Y-%m-%d")
            .map_err(|_| RequestError::InvalidTargetDate(self.target_date.clone()))
    }

    /// Decode history rows, skipping the ones that cannot be used
    pub fn history(&self) -> HistoryLoad {
        let mut load = HistoryLoad::default();
        for (row, value) in self.historical_data.iter().enumerate() {
            match serde_json::from_value::<HistoricalRecord>(value.clone()) {
                Ok(record) => load.records.push(record),
                Err(e) => {
                    load.rejected += 1;
                    warn!(row, error = %e, "Skipping unusable history row");
                }
            }
        }
        load
    }
}

/// The single failure shape returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_with_defaults() {
        let request = PredictionRequest::from_json(
            &json!({
                "user_id": "u1",
                "target_date": "2026-02-19",
                "historical_data": [],
                "all_activities": [1, 2, 3]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(request.confidence_threshold(), 0.5);
        assert_eq!(request.confidence_threshold_or(0.65), 0.65);
        assert_eq!(request.target_date().unwrap(), NaiveDate::from_ymd_opt(2026, 2, 19).unwrap());
        assert_eq!(request.all_activities, vec![1, 2, 3]);
        assert!(request.user_id_mapping.is_none());
    }

    #[test]
    fn test_invalid_target_date() {
        let err = PredictionRequest::from_json(
            &json!({ "user_id": "u1", "target_date": "19/02/2026" }).to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, RequestError::InvalidTargetDate(_)));
    }

    #[test]
    fn test_missing_user_id() {
        let err = PredictionRequest::from_json(&json!({ "user_id": " ", "target_date": "2026-02-19" }).to_string())
            .unwrap_err();
        assert!(matches!(err, RequestError::MissingUserId));
        assert!(PredictionRequest::from_json("{").is_err());
    }

    #[test]
    fn test_bad_rows_are_dropped() {
        let request: PredictionRequest = serde_json::from_value(json!({
            "user_id": "u1",
            "target_date": "2026-02-19",
            "historical_data": [
                { "user_id": "u1", "activity_id": 1, "log_date": "2026-02-16", "total_hours": "4.00", "is_billable": 1 },
                { "user_id": "u1", "activity_id": 1, "log_date": "not a date", "total_hours": 2 },
                { "user_id": "u1", "activity_id": 2, "log_date": "2026-02-17", "total_hours": null },
                "garbage"
            ],
            "all_activities": [1, 2],
            "confidence_threshold": 0.7
        }))
        .unwrap();

        let load = request.history();
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.rejected, 3);
        assert_eq!(load.records[0].total_hours, 4.0);
        assert_eq!(request.confidence_threshold_or(0.5), 0.7);
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ErrorResponse::new("model not found")).unwrap();
        assert_eq!(body, json!({ "error": "model not found" }));
    }
}
