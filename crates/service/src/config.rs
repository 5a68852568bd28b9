//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use timesheet_lib::predictor::DEFAULT_CONFIDENCE_THRESHOLD;

/// Service configuration, read from `TSP_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Path to the model manifest
    pub model_path: PathBuf,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Threshold applied when a request does not carry one
    #[serde(default = "default_confidence_threshold")]
    pub default_confidence_threshold: f64,

    /// Instance name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_api_port() -> u16 {
    8080
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "timesheet-service".to_string())
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("TSP").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration (TSP_MODEL_PATH is required)")
    }
}
