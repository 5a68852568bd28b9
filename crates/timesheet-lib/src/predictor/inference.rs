//! ONNX inference using tract
//!
//! Runs an exported binary classifier (zipmap disabled, so outputs are a
//! `label` int64 tensor and a `probabilities` float tensor) through a
//! tract plan fixed at one row per run.

use super::Classifier;
use crate::error::PredictorError;
use crate::models::{Classification, FeatureVector, NUM_FEATURES};
use tract_onnx::prelude::*;

/// Per-row inference latency above which a run counts as slow
pub const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, PredictorError> {
        let malformed = |stage: &str, e: TractError| {
            PredictorError::MalformedModel(format!("{}: {:#}", stage, e))
        };
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| malformed("failed to parse ONNX model", e))?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .map_err(|e| malformed("failed to set input shape", e))?
            .into_optimized()
            .map_err(|e| malformed("failed to optimize model", e))?
            .into_runnable()
            .map_err(|e| malformed("failed to create runnable model", e))?;
        Ok(Self { model })
    }

    /// Convert feature vector to tensor input
    fn features_to_tensor(features: &FeatureVector) -> Result<Tensor, PredictorError> {
        tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), features.to_f32_row().to_vec())
            .map(Into::into)
            .map_err(|e| PredictorError::Inference(format!("bad input shape: {}", e)))
    }

    fn run_row(&self, features: &FeatureVector) -> Result<Classification, PredictorError> {
        let input = Self::features_to_tensor(features)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictorError::Inference(format!("{:#}", e)))?;
        decode_outputs(&outputs)
    }
}

/// Read the positive-class probability and label from the model outputs
fn decode_outputs(outputs: &[TValue]) -> Result<Classification, PredictorError> {
    let inference = |msg: String| PredictorError::Inference(msg);

    let probabilities = outputs
        .iter()
        .find(|t| t.datum_type() == DatumType::F32)
        .ok_or_else(|| inference("model produced no probability output".to_string()))?
        .as_slice::<f32>()
        .map_err(|e| inference(format!("{:#}", e)))?;
    if probabilities.len() != 2 {
        return Err(inference(format!(
            "probability output has {} values, expected 2",
            probabilities.len()
        )));
    }
    let probability = probabilities[1] as f64;

    let label = match outputs.iter().find(|t| t.datum_type() == DatumType::I64) {
        Some(labels) => {
            let labels = labels
                .as_slice::<i64>()
                .map_err(|e| inference(format!("{:#}", e)))?;
            match labels.first() {
                Some(1) => 1,
                Some(_) => 0,
                None => return Err(inference("empty label output".to_string())),
            }
        }
        None => u8::from(probabilities[1] > probabilities[0]),
    };

    Ok(Classification { label, probability })
}

impl Classifier for OnnxClassifier {
    fn classify(&self, batch: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError> {
        batch.iter().map(|features| self.run_row(features)).collect()
    }
}

/// Inference statistics
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
