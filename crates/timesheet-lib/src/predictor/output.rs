//! Prediction output formatting and ranking
//!
//! Turns kept classifications into display-ready timesheet lines: metadata
//! from the activity's history (or a placeholder when there is none),
//! rounded durations and confidences, highest confidence first.

use super::features::round_to;
use super::history::HistoryIndex;
use crate::models::PredictionResult;
use chrono::NaiveDate;

/// Duration suggested for an activity with no history
pub const DEFAULT_DURATION_HOURS: f64 = 8.0;

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Hours reported for activities never seen in history
    pub default_duration_hours: f64,
    /// Decimal places of `predicted_duration`
    pub duration_decimals: i32,
    /// Decimal places of `confidence`
    pub confidence_decimals: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_duration_hours: DEFAULT_DURATION_HOURS,
            duration_decimals: 2,
            confidence_decimals: 4,
        }
    }
}

/// Builds and ranks `PredictionResult`s
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Format one kept prediction
    pub fn format(
        &self,
        activity_id: i64,
        probability: f64,
        date: NaiveDate,
        history: &HistoryIndex,
    ) -> PredictionResult {
        let confidence = round_to(probability, self.config.confidence_decimals);

        match history.activity(activity_id) {
            Some(activity) => {
                let meta = activity.metadata();
                PredictionResult {
                    activity_id,
                    activity_name: meta.activity_name.clone(),
                    activity_code: meta.activity_code.clone(),
                    is_billable: meta.is_billable,
                    predicted_duration: round_to(activity.mean_hours(), self.config.duration_decimals),
                    confidence,
                    date,
                }
            }
            None => PredictionResult {
                activity_id,
                activity_name: format!("Activity {}", activity_id),
                activity_code: format!("ACT{}", activity_id),
                is_billable: false,
                predicted_duration: self.config.default_duration_hours,
                confidence,
                date,
            },
        }
    }

    /// Sort by confidence, highest first; equal confidences keep their order
    pub fn rank(&self, results: &mut [PredictionResult]) {
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    }
}
