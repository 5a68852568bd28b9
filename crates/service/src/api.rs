//! HTTP API for predictions, model diagnostics, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use timesheet_lib::{
    predictor::InferenceStats, ErrorResponse, PredictionRequest, PredictorMetrics,
    StructuredLogger, TimesheetPredictor,
};
use tracing::info;

/// Shared application state
pub struct AppState {
    pub predictor: Arc<TimesheetPredictor>,
    pub metrics: PredictorMetrics,
    pub logger: StructuredLogger,
    pub default_confidence_threshold: f64,
}

impl AppState {
    pub fn new(
        predictor: Arc<TimesheetPredictor>,
        metrics: PredictorMetrics,
        logger: StructuredLogger,
        default_confidence_threshold: f64,
    ) -> Self {
        Self {
            predictor,
            metrics,
            logger,
            default_confidence_threshold,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_version: String,
    model_type: String,
    inference: InferenceStats,
}

fn error_response(state: &AppState, status: StatusCode, error: impl std::fmt::Display) -> Response {
    let body = ErrorResponse::new(error);
    state.metrics.inc_prediction_errors();
    state.logger.log_request_failed(&body.error);
    (status, Json(body)).into_response()
}

/// Daily timesheet prediction
///
/// The body is decoded by hand so that malformed input gets the same
/// `{"error": ...}` shape as every other failure.
async fn predict(State(state): State<Arc<AppState>>, body: String) -> Response {
    let start = Instant::now();

    let request = match PredictionRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return error_response(&state, StatusCode::BAD_REQUEST, e),
    };
    let target_date = match request.target_date() {
        Ok(date) => date,
        Err(e) => return error_response(&state, StatusCode::BAD_REQUEST, e),
    };

    let history = request.history();
    let threshold = request.confidence_threshold_or(state.default_confidence_threshold);

    let results = match state.predictor.predict_daily_timesheet(
        &request.user_id,
        target_date,
        &request.all_activities,
        &history.records,
        request.user_id_mapping.as_ref(),
        threshold,
    ) {
        Ok(results) => results,
        Err(e) => return error_response(&state, StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    let elapsed = start.elapsed();
    state.metrics.observe_prediction_latency(elapsed.as_secs_f64());
    state
        .metrics
        .add_candidates_scored(request.all_activities.len() as u64);
    state.metrics.add_predictions_emitted(results.len() as u64);
    state
        .metrics
        .add_history_rows_rejected(history.rejected as u64);
    state.logger.log_daily_prediction(
        &request.user_id,
        &request.target_date,
        request.all_activities.len(),
        results.len(),
        history.rejected,
        elapsed.as_millis(),
    );

    (StatusCode::OK, Json(results)).into_response()
}

/// Loaded model descriptor
async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.predictor.get_model_info().clone())
}

/// Health check response, with the loaded model and inference counters
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = state.predictor.get_model_info();
    let health = HealthResponse {
        status: "healthy",
        model_version: info.version.clone(),
        model_type: info.model_type.clone(),
        inference: state.predictor.stats(),
    };
    (StatusCode::OK, Json(health))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict", post(predict))
        .route("/v1/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
