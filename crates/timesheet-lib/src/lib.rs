//! Timesheet prediction library
//!
//! This crate provides the core functionality for:
//! - Feature derivation from historical timesheet records
//! - Classifier loading and inference
//! - Ranked, thresholded daily timesheet predictions
//! - The request contract used by the service and CLI
//! - Metrics and structured logging

pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod request;

pub use error::{PredictorError, RequestError};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::{Classifier, TimesheetPredictor};
pub use request::{ErrorResponse, HistoryLoad, PredictionRequest};
