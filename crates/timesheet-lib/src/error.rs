//! Error types for the timesheet predictor
//!
//! `PredictorError` is the fatal tier: without a valid classifier nothing can
//! be predicted. Defects in individual history rows or candidates never
//! surface here; they degrade to documented default feature values.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("failed to read model artifact {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature order mismatch at position {position}: model expects {expected:?}, pipeline produces {actual:?}")]
    FeatureOrder {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("model expects {expected} features, pipeline produces {actual}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("malformed model: {0}")]
    MalformedModel(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors in a boundary request (the caller's payload, not the model)
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid JSON request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("target_date must be in YYYY-MM-DD format, got {0:?}")]
    InvalidTargetDate(String),

    #[error("user_id is required")]
    MissingUserId,

    #[error("confidence_threshold must be a finite number, got {0}")]
    InvalidThreshold(f64),
}
