//! Model diagnostics command

use anyhow::Result;
use timesheet_lib::TimesheetPredictor;
use tracing::debug;

use crate::output::{print_model_info, OutputFormat};

/// Show the loaded model descriptor
pub fn model_info(predictor: &TimesheetPredictor, format: OutputFormat) -> Result<()> {
    let info = predictor.get_model_info();
    debug!(model_type = %info.model_type, version = %info.version, "Describing model");
    print_model_info(info, format)
}
