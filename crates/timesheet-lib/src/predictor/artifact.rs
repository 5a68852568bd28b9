//! Versioned classifier artifacts
//!
//! An artifact is a JSON manifest next to a weights file:
//!
//! ```json
//! {
//!   "version": "2026.02.18",
//!   "model_type": "RandomForestClassifier",
//!   "format": "forest",
//!   "weights": "random_forest_timesheet_predictor.json",
//!   "sha256": "9f86d0...",
//!   "n_estimators": 100,
//!   "max_depth": 10,
//!   "n_features": 12,
//!   "feature_names": ["day_of_week_encoded", "..."]
//! }
//! ```
//!
//! The manifest's feature names are checked against the pipeline's canonical
//! order at load time, so a model fit on a different column order is refused
//! instead of silently mis-predicting.

use super::forest::ForestClassifier;
use super::inference::OnnxClassifier;
use super::Classifier;
use crate::error::PredictorError;
use crate::models::{ModelInfo, FEATURE_NAMES, NUM_FEATURES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Weights encoding named by the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Exported tree arrays, see `forest::ForestDump`
    Forest,
    /// ONNX graph with label and probability outputs
    Onnx,
}

/// Artifact manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub model_type: String,
    pub format: ArtifactFormat,
    /// Weights path, relative to the manifest's directory
    pub weights: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    pub n_features: usize,
    pub feature_names: Vec<String>,
}

impl ModelManifest {
    /// Fail fast if the model was fit on a different feature layout
    pub fn validate_features(&self) -> Result<(), PredictorError> {
        for (position, canonical) in FEATURE_NAMES.iter().enumerate() {
            match self.feature_names.get(position) {
                Some(name) if name == canonical => {}
                name => {
                    return Err(PredictorError::FeatureOrder {
                        position,
                        expected: name.cloned().unwrap_or_default(),
                        actual: canonical.to_string(),
                    })
                }
            }
        }
        if self.feature_names.len() != NUM_FEATURES {
            return Err(PredictorError::FeatureWidth {
                expected: self.feature_names.len(),
                actual: NUM_FEATURES,
            });
        }
        if self.n_features != NUM_FEATURES {
            return Err(PredictorError::FeatureWidth {
                expected: self.n_features,
                actual: NUM_FEATURES,
            });
        }
        Ok(())
    }
}

/// A loaded, validated classifier together with its description
pub struct ModelArtifact {
    pub classifier: Arc<dyn Classifier>,
    pub info: ModelInfo,
    pub checksum: String,
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("info", &self.info)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl ModelArtifact {
    /// Load and validate the artifact described by the manifest at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PredictorError> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|source| PredictorError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: ModelManifest =
            serde_json::from_slice(&raw).map_err(|source| PredictorError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.validate_features()?;

        let weights_path = path
            .parent()
            .map(|dir| dir.join(&manifest.weights))
            .unwrap_or_else(|| manifest.weights.clone());
        let weights = fs::read(&weights_path).map_err(|source| PredictorError::ArtifactIo {
            path: weights_path.clone(),
            source,
        })?;

        let checksum = compute_checksum(&weights);
        if let Some(expected) = &manifest.sha256 {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(PredictorError::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
            debug!(checksum = %checksum, "Model checksum validated");
        }

        let artifact = Self::from_manifest(manifest, &weights, checksum)?;
        info!(
            path = %path.display(),
            version = %artifact.info.version,
            model_type = %artifact.info.model_type,
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Build the classifier for an already validated manifest
    pub fn from_manifest(
        manifest: ModelManifest,
        weights: &[u8],
        checksum: String,
    ) -> Result<Self, PredictorError> {
        manifest.validate_features()?;

        let (classifier, n_estimators, max_depth) = match manifest.format {
            ArtifactFormat::Forest => {
                let forest = ForestClassifier::from_json(weights)?;
                if let Some(expected) = manifest.n_estimators {
                    if expected as usize != forest.n_trees() {
                        return Err(PredictorError::MalformedModel(format!(
                            "manifest declares {} estimators, weights contain {}",
                            expected,
                            forest.n_trees()
                        )));
                    }
                }
                let n_estimators = manifest.n_estimators.or(Some(forest.n_trees() as u32));
                let max_depth = manifest.max_depth.or(Some(forest.max_depth() as u32));
                (Arc::new(forest) as Arc<dyn Classifier>, n_estimators, max_depth)
            }
            ArtifactFormat::Onnx => (
                Arc::new(OnnxClassifier::from_bytes(weights)?) as Arc<dyn Classifier>,
                manifest.n_estimators,
                manifest.max_depth,
            ),
        };

        Ok(Self {
            classifier,
            info: ModelInfo {
                model_type: manifest.model_type,
                version: manifest.version,
                n_estimators,
                max_depth,
                n_features: manifest.n_features,
                feature_names: manifest.feature_names,
            },
            checksum,
        })
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
