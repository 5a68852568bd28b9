//! Observability infrastructure for the timesheet predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, candidates scored, predictions emitted, model version)
//! - Structured JSON logging with tracing

use crate::models::ModelInfo;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    candidates_scored: IntCounter,
    predictions_emitted: IntCounter,
    history_rows_rejected: IntCounter,
    prediction_errors: IntCounter,
    model_version_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "timesheet_predictor_prediction_latency_seconds",
                "Time spent producing a daily timesheet prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            candidates_scored: register_int_counter!(
                "timesheet_predictor_candidates_scored_total",
                "Total number of candidate activities scored"
            )
            .expect("Failed to register candidates_scored"),

            predictions_emitted: register_int_counter!(
                "timesheet_predictor_predictions_emitted_total",
                "Total number of timesheet lines returned to callers"
            )
            .expect("Failed to register predictions_emitted"),

            history_rows_rejected: register_int_counter!(
                "timesheet_predictor_history_rows_rejected_total",
                "Total number of history rows dropped as unusable"
            )
            .expect("Failed to register history_rows_rejected"),

            prediction_errors: register_int_counter!(
                "timesheet_predictor_prediction_errors_total",
                "Total number of failed prediction requests"
            )
            .expect("Failed to register prediction_errors"),

            model_version_info: register_gauge_vec!(
                "timesheet_predictor_model_version_info",
                "Information about the currently loaded classifier",
                &["version", "model_type"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn add_candidates_scored(&self, count: u64) {
        self.inner().candidates_scored.inc_by(count);
    }

    pub fn add_predictions_emitted(&self, count: u64) {
        self.inner().predictions_emitted.inc_by(count);
    }

    pub fn add_history_rows_rejected(&self, count: u64) {
        self.inner().history_rows_rejected.inc_by(count);
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn set_model_version(&self, version: &str, model_type: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, model_type])
            .set(1.0);
    }
}

/// Structured logger for predictor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "predictor_started",
            instance = %self.instance,
            service_version = %version,
            model_version = %model_version,
            "Timesheet predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "predictor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Timesheet predictor shutting down"
        );
    }

    pub fn log_model_loaded(&self, info: &ModelInfo) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_type = %info.model_type,
            model_version = %info.version,
            n_estimators = ?info.n_estimators,
            max_depth = ?info.max_depth,
            n_features = info.n_features,
            "Classifier loaded"
        );
    }

    /// Log a completed daily prediction
    pub fn log_daily_prediction(
        &self,
        user_id: &str,
        target_date: &str,
        candidates: usize,
        kept: usize,
        rejected_rows: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "daily_prediction",
            instance = %self.instance,
            user_id = %user_id,
            target_date = %target_date,
            candidates = candidates,
            kept = kept,
            rejected_rows = rejected_rows,
            elapsed_ms = elapsed_ms,
            "Generated daily timesheet prediction"
        );
        if rejected_rows > 0 {
            warn!(
                event = "history_rows_rejected",
                instance = %self.instance,
                user_id = %user_id,
                rejected_rows = rejected_rows,
                "Unusable history rows were skipped"
            );
        }
    }

    pub fn log_request_failed(&self, reason: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            reason = %reason,
            "Prediction request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = PredictorMetrics::new();
        metrics.observe_prediction_latency(0.002);
        metrics.add_candidates_scored(4);
        metrics.add_predictions_emitted(2);
        metrics.add_history_rows_rejected(1);
        metrics.inc_prediction_errors();
        metrics.set_model_version("v1", "RandomForestClassifier");

        let other = PredictorMetrics::new();
        other.add_candidates_scored(1);
        assert!(GLOBAL_METRICS.get().unwrap().candidates_scored.get() >= 5);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
