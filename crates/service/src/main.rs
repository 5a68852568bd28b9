//! Timesheet Service - daily timesheet prediction over HTTP
//!
//! Loads the trained classifier once at startup and answers prediction
//! requests against it until shut down.

use anyhow::{Context, Result};
use std::sync::Arc;
use timesheet_lib::{PredictorMetrics, StructuredLogger, TimesheetPredictor};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting timesheet-service");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        "Service configured"
    );

    // A missing or inconsistent model is fatal
    let predictor = TimesheetPredictor::from_artifact(&config.model_path)
        .inspect_err(|e| error!(error = %e, "Failed to load model"))
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
    let info = predictor.get_model_info().clone();

    // Initialize metrics
    let metrics = PredictorMetrics::new();
    metrics.set_model_version(&info.version, &info.model_type);

    // Initialize structured logger
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_model_loaded(&info);
    logger.log_startup(SERVICE_VERSION, &info.version);

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        Arc::new(predictor),
        metrics,
        logger.clone(),
        config.default_confidence_threshold,
    ));

    // Start prediction, health and metrics server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal or server failure
    tokio::select! {
        result = api_handle => {
            logger.log_shutdown("API server stopped");
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }
    info!("Shutting down");

    Ok(())
}
