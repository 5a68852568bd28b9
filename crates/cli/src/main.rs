//! Timesheet Predictor CLI
//!
//! Runs the prediction pipeline against a local model artifact: daily
//! timesheet predictions, feature diagnostics and model details.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use timesheet_lib::{ErrorResponse, TimesheetPredictor};
use tracing_subscriber::EnvFilter;

use commands::{model, predict};
use output::OutputFormat;

/// Timesheet Predictor CLI
#[derive(Parser)]
#[command(name = "tsp")]
#[command(author, version, about = "CLI for the Timesheet Predictor", long_about = None)]
pub struct Cli {
    /// Model manifest path (can also be set via TSP_MODEL_PATH env var)
    #[arg(long, env = "TSP_MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Output format [default: json]
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the activities on a user's timesheet for a date
    Predict {
        /// Request JSON, `@file` or `-` for stdin
        #[arg(long, short)]
        request: String,

        /// Override the request's confidence threshold
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show the feature vector of every requested activity
    Features {
        /// Request JSON, `@file` or `-` for stdin
        #[arg(long, short)]
        request: String,

        /// Start time to encode, e.g. `14:30` or a JS date string [default: 09:00]
        #[arg(long)]
        start_time: Option<String>,
    },

    /// Show the loaded model
    ModelInfo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let body = ErrorResponse::new(format!("{:#}", e));
            match serde_json::to_string(&body) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;

    let format = match cli.format {
        Some(format) => format,
        None => match config.default_format.as_deref() {
            Some(name) => OutputFormat::from_str(name, true)
                .map_err(|e| anyhow::anyhow!("invalid default_format in config: {}", e))?,
            None => OutputFormat::default(),
        },
    };

    let model_path = cli
        .model
        .or(config.model_path)
        .context("no model configured; pass --model or set TSP_MODEL_PATH")?;
    let predictor = TimesheetPredictor::from_artifact(&model_path)
        .with_context(|| format!("failed to load model from {}", model_path.display()))?;

    match cli.command {
        Commands::Predict { request, threshold } => {
            let request = predict::read_request(&request)?;
            predict::predict(&predictor, &request, threshold, format)
        }
        Commands::Features { request, start_time } => {
            let request = predict::read_request(&request)?;
            predict::features(&predictor, &request, start_time.as_deref(), format)
        }
        Commands::ModelInfo => model::model_info(&predictor, format),
    }
}
