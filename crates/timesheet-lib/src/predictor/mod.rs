//! ML prediction engine

mod artifact;
mod features;
mod forest;
mod history;
mod inference;
mod output;
mod timesheet;

pub use artifact::{compute_checksum, ArtifactFormat, ModelArtifact, ModelManifest};
pub use features::{
    parse_start_time, FeatureExtractor, DEFAULT_HOUR_OF_DAY, MONTH_END_DAY, RECENT_WINDOW_DAYS,
};
pub use forest::{ForestClassifier, ForestDump, TreeDump};
pub use history::{ActivityHistory, ActivityMetadata, HistoryIndex};
pub use inference::{InferenceStats, OnnxClassifier, MAX_INFERENCE_MS};
pub use output::{OutputConfig, OutputFormatter, DEFAULT_DURATION_HOURS};
pub use timesheet::{TimesheetPredictor, DEFAULT_CONFIDENCE_THRESHOLD};

use crate::error::PredictorError;
use crate::models::{Classification, FeatureVector};

/// Trait for binary classifier back ends
///
/// Implementations are immutable once loaded and may be shared across
/// threads for read-only inference.
pub trait Classifier: Send + Sync {
    /// Class label and positive-class probability per vector, in input order
    fn classify(&self, batch: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError>;

    /// Predicted class per vector
    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<u8>, PredictorError> {
        Ok(self.classify(batch)?.into_iter().map(|c| c.label).collect())
    }

    /// Positive-class probability per vector
    fn predict_proba(&self, batch: &[FeatureVector]) -> Result<Vec<f64>, PredictorError> {
        Ok(self.classify(batch)?.into_iter().map(|c| c.probability).collect())
    }
}
