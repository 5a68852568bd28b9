//! CLI integration tests

use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use timesheet_lib::{predictor::compute_checksum, FEATURE_NAMES};

const FOREST: &str = r#"{"trees": [{
    "children_left": [1, -1, -1],
    "children_right": [2, -1, -1],
    "feature": [8, -2, -2],
    "threshold": [0.5, -2.0, -2.0],
    "value": [[12.0, 8.0], [10.0, 0.0], [2.0, 8.0]]
}]}"#;

fn write_model(dir: &TempDir) -> PathBuf {
    std::fs::write(dir.path().join("forest.json"), FOREST).unwrap();
    let manifest = json!({
        "version": "cli-test",
        "model_type": "RandomForestClassifier",
        "format": "forest",
        "weights": "forest.json",
        "sha256": compute_checksum(FOREST.as_bytes()),
        "n_features": 12,
        "feature_names": FEATURE_NAMES,
    });
    let path = dir.path().join("model.json");
    std::fs::write(&path, manifest.to_string()).unwrap();
    path
}

fn request_json() -> String {
    json!({
        "user_id": "u1",
        "target_date": "2026-03-02",
        "historical_data": [
            { "user_id": "u1", "activity_id": 3, "activity_name": "Support", "activity_code": "SUP",
              "is_billable": 1, "log_date": "2026-02-23", "total_hours": "3.50" }
        ],
        "all_activities": [5, 3]
    })
    .to_string()
}

fn tsp(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "tsp-cli", "--"])
        .args(args)
        .env_remove("TSP_MODEL_PATH")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = tsp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Timesheet Predictor"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("features"), "Should show features command");
    assert!(stdout.contains("model-info"), "Should show model-info command");
    assert!(stdout.contains("--model"), "Should show model option");
    assert!(stdout.contains("--format"), "Should show format option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = tsp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("tsp"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = tsp(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--request"), "Should show request option");
    assert!(stdout.contains("--threshold"), "Should show threshold option");
}

/// Test a full prediction against a model on disk
#[test]
fn test_predict_prints_json() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir);
    let request = request_json();

    let output = tsp(&["--model", model.to_str().unwrap(), "predict", "--request", &request]);
    assert!(output.status.success(), "Predict should succeed");

    let results: Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["activity_id"], 3);
    assert_eq!(results[0]["activity_name"], "Support");
    assert_eq!(results[0]["predicted_duration"], 3.5);
    assert_eq!(results[0]["confidence"], 0.8);
    assert_eq!(results[0]["date"], "2026-03-02");
}

/// Test that a request file is accepted and the threshold flag applies
#[test]
fn test_predict_request_file_with_threshold() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir);
    let request_path = dir.path().join("request.json");
    std::fs::write(&request_path, request_json()).unwrap();

    let output = tsp(&[
        "--model",
        model.to_str().unwrap(),
        "predict",
        "--request",
        &format!("@{}", request_path.display()),
        "--threshold",
        "0.9",
    ]);
    assert!(output.status.success(), "Predict should succeed");

    let results: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results, json!([]));
}

/// Test the feature diagnostics command
#[test]
fn test_features_command() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir);
    let request = request_json();

    let output = tsp(&["--model", model.to_str().unwrap(), "features", "--request", &request]);
    assert!(output.status.success(), "Features should succeed");

    let vectors: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(vectors[0]["activity_id"], 5);
    assert_eq!(vectors[0]["total_occurrences"], 0);
    assert_eq!(vectors[1]["total_occurrences"], 1);
    assert_eq!(vectors[1]["day_of_week_encoded"], 0);
    assert_eq!(vectors[1]["hour_of_day"], 9);
}

/// Test that a start time flows into the hour feature
#[test]
fn test_features_with_start_time() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir);
    let request = request_json();

    let output = tsp(&[
        "--model",
        model.to_str().unwrap(),
        "features",
        "--request",
        &request,
        "--start-time",
        "Mon Mar 02 2026 14:30:00 GMT+0000",
    ]);
    assert!(output.status.success(), "Features should succeed");

    let vectors: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(vectors[0]["hour_of_day"], 14);
    assert_eq!(vectors[1]["hour_of_day"], 14);
}

/// Test the model-info command
#[test]
fn test_model_info_command() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir);

    let output = tsp(&["--model", model.to_str().unwrap(), "model-info"]);
    assert!(output.status.success(), "Model info should succeed");

    let info: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], "cli-test");
    assert_eq!(info["n_features"], 12);
}

/// Test that failures print a JSON error and exit non-zero
#[test]
fn test_failure_prints_error_json() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let output = tsp(&["--model", missing.to_str().unwrap(), "model-info"]);
    assert!(!output.status.success(), "Missing model should fail");
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let last_line = stderr.lines().last().unwrap();
    let error: Value = serde_json::from_str(last_line).unwrap();
    assert!(error["error"].as_str().unwrap().contains("failed to load model"));
}

/// Test invalid command handling
#[test]
fn test_invalid_command() {
    let output = tsp(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
}
