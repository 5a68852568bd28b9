//! Prediction and feature inspection commands

use anyhow::{Context, Result};
use std::io::Read;
use timesheet_lib::predictor::parse_start_time;
use timesheet_lib::{PredictionCandidate, PredictionRequest, TimesheetPredictor};
use tracing::debug;

use crate::output::{print_features, print_predictions, print_warning, OutputFormat};

/// Read a request given inline, as `@path`, or as `-` for stdin
pub fn read_request(source: &str) -> Result<PredictionRequest> {
    let raw = match source {
        "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
        s if s.starts_with('@') => {
            let path = &s[1..];
            std::fs::read_to_string(path).with_context(|| format!("Failed to read request file {}", path))?
        }
        s => s.to_string(),
    };

    Ok(PredictionRequest::from_json(&raw)?)
}

/// Predict the daily timesheet for the request
pub fn predict(
    predictor: &TimesheetPredictor,
    request: &PredictionRequest,
    threshold: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let history = request.history();
    if history.rejected > 0 {
        print_warning(&format!("Skipped {} unusable history rows", history.rejected));
    }

    let threshold = threshold.unwrap_or_else(|| request.confidence_threshold());
    debug!(
        user_id = %request.user_id,
        candidates = request.all_activities.len(),
        threshold,
        "Predicting daily timesheet"
    );

    let results = predictor.predict_daily_timesheet(
        &request.user_id,
        request.target_date()?,
        &request.all_activities,
        &history.records,
        request.user_id_mapping.as_ref(),
        threshold,
    )?;

    print_predictions(&results, format)
}

/// Print the feature vector of every requested activity, without scoring
pub fn features(
    predictor: &TimesheetPredictor,
    request: &PredictionRequest,
    start_time: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let history = request.history();
    if history.rejected > 0 {
        print_warning(&format!("Skipped {} unusable history rows", history.rejected));
    }

    let target_date = request.target_date()?;
    let candidates = candidates(request, target_date, start_time);

    let vectors = predictor.features(&candidates, &history.records, request.user_id_mapping.as_ref());
    print_features(&vectors, format)
}

/// One candidate per requested activity, all sharing the parsed start time
fn candidates(
    request: &PredictionRequest,
    target_date: chrono::NaiveDate,
    start_time: Option<&str>,
) -> Vec<PredictionCandidate> {
    let start = start_time.and_then(|raw| {
        let parsed = parse_start_time(raw);
        if parsed.is_none() {
            print_warning(&format!("Unrecognised start time {:?}, using the default hour", raw));
        }
        parsed
    });

    request
        .all_activities
        .iter()
        .map(|&id| {
            let candidate = PredictionCandidate::new(request.user_id.as_str(), id, target_date);
            match start {
                Some(t) => candidate.with_start_time(t),
                None => candidate,
            }
        })
        .collect()
}
