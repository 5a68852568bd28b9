//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use timesheet_lib::{FeatureVector, ModelInfo, PredictionResult};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default), for the calling process
    #[default]
    Json,
    /// Table format, for people
    Table,
}

/// Row for the predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Activity")]
    activity_id: i64,
    #[tabled(rename = "Name")]
    activity_name: String,
    #[tabled(rename = "Code")]
    activity_code: String,
    #[tabled(rename = "Billable")]
    is_billable: String,
    #[tabled(rename = "Hours")]
    predicted_duration: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Date")]
    date: String,
}

/// Row for the features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Activity")]
    activity_id: i64,
    #[tabled(rename = "DoW")]
    day_of_week: u32,
    #[tabled(rename = "Hour")]
    hour: u32,
    #[tabled(rename = "Month")]
    month: u32,
    #[tabled(rename = "MonthEnd")]
    month_end: u8,
    #[tabled(rename = "Freq")]
    frequency: f64,
    #[tabled(rename = "AvgHrs")]
    avg_duration: f64,
    #[tabled(rename = "Consistency")]
    consistency: f64,
    #[tabled(rename = "Trend")]
    trend: f64,
    #[tabled(rename = "Seen")]
    occurrences: u32,
    #[tabled(rename = "Billable")]
    billable: u8,
    #[tabled(rename = "User")]
    user: i64,
}

/// Row for the model info table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_predictions(results: &[PredictionResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(results),
        OutputFormat::Table => {
            if results.is_empty() {
                println!("{}", "No activities predicted".yellow());
                return Ok(());
            }
            let rows: Vec<PredictionRow> = results
                .iter()
                .map(|r| PredictionRow {
                    activity_id: r.activity_id,
                    activity_name: r.activity_name.clone(),
                    activity_code: r.activity_code.clone(),
                    is_billable: if r.is_billable { "yes".green().to_string() } else { "no".to_string() },
                    predicted_duration: format!("{:.2}", r.predicted_duration),
                    confidence: color_confidence(r.confidence),
                    date: r.date.format("%Y-%m-%d").to_string(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            Ok(())
        }
    }
}

pub fn print_features(features: &[FeatureVector], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(features),
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = features
                .iter()
                .map(|f| FeatureRow {
                    activity_id: f.activity_id,
                    day_of_week: f.day_of_week_encoded,
                    hour: f.hour_of_day,
                    month: f.month,
                    month_end: f.is_month_end,
                    frequency: f.activity_frequency,
                    avg_duration: f.avg_duration,
                    consistency: f.duration_consistency,
                    trend: f.recent_trend,
                    occurrences: f.total_occurrences,
                    billable: f.is_billable,
                    user: f.user_id_encoded,
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            Ok(())
        }
    }
}

pub fn print_model_info(info: &ModelInfo, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(info),
        OutputFormat::Table => {
            let optional = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            let rows = vec![
                FieldRow { field: "Model type".into(), value: info.model_type.clone() },
                FieldRow { field: "Version".into(), value: info.version.clone() },
                FieldRow { field: "Estimators".into(), value: optional(info.n_estimators) },
                FieldRow { field: "Max depth".into(), value: optional(info.max_depth) },
                FieldRow { field: "Features".into(), value: info.n_features.to_string() },
                FieldRow { field: "Feature order".into(), value: info.feature_names.join("\n") },
            ];
            println!("{}", Table::new(rows).with(Style::rounded()));
            Ok(())
        }
    }
}

/// Print a warning message on stderr, keeping stdout parseable
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_confidence(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
