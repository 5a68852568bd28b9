//! Timesheet predictor
//!
//! Owns the loaded classifier and turns candidates plus history into
//! classifications and ranked daily timesheet suggestions.

use super::artifact::ModelArtifact;
use super::features::FeatureExtractor;
use super::history::HistoryIndex;
use super::inference::{InferenceStats, MAX_INFERENCE_MS};
use super::output::OutputFormatter;
use super::Classifier;
use crate::error::PredictorError;
use crate::models::{
    Classification, FeatureVector, HistoricalRecord, ModelInfo, PredictionCandidate,
    PredictionResult, ScoredCandidate, UserIdMapping,
};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Minimum positive-class probability kept when the caller gives none
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Predicts which activities belong on a user's timesheet
pub struct TimesheetPredictor {
    classifier: Arc<dyn Classifier>,
    info: ModelInfo,
    extractor: FeatureExtractor,
    output_formatter: OutputFormatter,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl std::fmt::Debug for TimesheetPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimesheetPredictor")
            .field("info", &self.info)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TimesheetPredictor {
    /// Wrap an already loaded classifier
    pub fn new(classifier: Arc<dyn Classifier>, info: ModelInfo) -> Self {
        Self {
            classifier,
            info,
            extractor: FeatureExtractor::new(),
            output_formatter: OutputFormatter::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Load the artifact at `manifest_path`; any defect is fatal
    pub fn from_artifact(manifest_path: impl AsRef<Path>) -> Result<Self, PredictorError> {
        let artifact = ModelArtifact::load(manifest_path)?;
        Ok(Self::new(artifact.classifier, artifact.info))
    }

    pub fn with_output_formatter(mut self, output_formatter: OutputFormatter) -> Self {
        self.output_formatter = output_formatter;
        self
    }

    /// Score one candidate: (label, positive-class probability)
    pub fn predict_single(
        &self,
        candidate: &PredictionCandidate,
        history: &[HistoricalRecord],
        mapping: Option<&UserIdMapping>,
    ) -> Result<(u8, f64), PredictorError> {
        let index = HistoryIndex::build(history);
        let c = self.score(&self.extractor.extract(candidate, &index, mapping))?;
        Ok((c.label, c.probability))
    }

    /// Score many candidates with a single classifier call, in input order
    pub fn predict_batch(
        &self,
        candidates: &[PredictionCandidate],
        history: &[HistoricalRecord],
        mapping: Option<&UserIdMapping>,
    ) -> Result<Vec<ScoredCandidate>, PredictorError> {
        let index = HistoryIndex::build(history);
        let vectors = self.extractor.extract_batch(candidates, &index, mapping);
        let classifications = self.classify(&vectors)?;

        Ok(candidates
            .iter()
            .zip(classifications)
            .map(|(candidate, c)| ScoredCandidate {
                candidate: candidate.clone(),
                label: c.label,
                probability: c.probability,
            })
            .collect())
    }

    /// Suggested timesheet lines for `user_id` on `target_date`.
    ///
    /// A candidate is kept only when its label is 1 and its probability is
    /// at least `confidence_threshold`. Results are ordered by confidence,
    /// highest first, with ties in `activity_ids` order.
    pub fn predict_daily_timesheet(
        &self,
        user_id: &str,
        target_date: NaiveDate,
        activity_ids: &[i64],
        history: &[HistoricalRecord],
        mapping: Option<&UserIdMapping>,
        confidence_threshold: f64,
    ) -> Result<Vec<PredictionResult>, PredictorError> {
        let index = HistoryIndex::build(history);
        let mut results = Vec::new();

        for &activity_id in activity_ids {
            let candidate = PredictionCandidate::new(user_id, activity_id, target_date);
            let c = self.score(&self.extractor.extract(&candidate, &index, mapping))?;

            if c.label == 1 && c.probability >= confidence_threshold {
                results.push(
                    self.output_formatter
                        .format(activity_id, c.probability, target_date, &index),
                );
            } else {
                debug!(
                    activity_id,
                    label = c.label,
                    probability = c.probability,
                    "Candidate filtered out"
                );
            }
        }

        self.output_formatter.rank(&mut results);
        Ok(results)
    }

    /// Feature vectors for a set of candidates, without running the model
    pub fn features(
        &self,
        candidates: &[PredictionCandidate],
        history: &[HistoricalRecord],
        mapping: Option<&UserIdMapping>,
    ) -> Vec<FeatureVector> {
        self.extractor
            .extract_batch(candidates, &HistoryIndex::build(history), mapping)
    }

    /// Diagnostic description of the loaded model
    pub fn get_model_info(&self) -> &ModelInfo {
        &self.info
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }

    fn score(&self, features: &FeatureVector) -> Result<Classification, PredictorError> {
        self.classify(std::slice::from_ref(features))?
            .into_iter()
            .next()
            .ok_or_else(|| PredictorError::Inference("classifier returned no output".to_string()))
    }

    fn classify(&self, vectors: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError> {
        if vectors.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let classifications = self.classifier.classify(vectors)?;
        if classifications.len() != vectors.len() {
            return Err(PredictorError::Inference(format!(
                "classifier returned {} results for {} inputs",
                classifications.len(),
                vectors.len()
            )));
        }

        let elapsed = start.elapsed();
        let rows = vectors.len() as u64;
        self.inference_count.fetch_add(rows, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS * rows as u128 {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                rows,
                "Inference exceeded {}ms per row target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), rows, "Inference completed");
        }

        Ok(classifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Returns a fixed classification per activity id and records batch sizes
    struct ScriptedClassifier {
        outcomes: HashMap<i64, Classification>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedClassifier {
        fn new(outcomes: &[(i64, u8, f64)]) -> Self {
            Self {
                outcomes: outcomes
                    .iter()
                    .map(|&(id, label, probability)| (id, Classification { label, probability }))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for ScriptedClassifier {
        fn classify(&self, batch: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError> {
            self.calls.lock().unwrap().push(batch.len());
            Ok(batch
                .iter()
                .map(|f| {
                    self.outcomes
                        .get(&f.activity_id)
                        .copied()
                        .unwrap_or(Classification { label: 0, probability: 0.0 })
                })
                .collect())
        }
    }

    #[test]
    fn test_debug_shows_model_and_counters() {
        let (predictor, _) = predictor(&[]);
        let rendered = format!("{:?}", predictor);
        assert!(rendered.contains("TimesheetPredictor"));
        assert!(rendered.contains("total_inferences: 0"));
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn classify(&self, _batch: &[FeatureVector]) -> Result<Vec<Classification>, PredictorError> {
            Ok(Vec::new())
        }
    }

    fn info() -> ModelInfo {
        ModelInfo {
            model_type: "RandomForestClassifier".to_string(),
            version: "test".to_string(),
            n_estimators: Some(100),
            max_depth: Some(10),
            n_features: 12,
            feature_names: crate::models::FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn predictor(outcomes: &[(i64, u8, f64)]) -> (TimesheetPredictor, Arc<ScriptedClassifier>) {
        let classifier = Arc::new(ScriptedClassifier::new(outcomes));
        (TimesheetPredictor::new(classifier.clone(), info()), classifier)
    }

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn history() -> Vec<HistoricalRecord> {
        [(7, 4.0), (7, 6.0), (3, 2.5)]
            .iter()
            .map(|&(activity_id, hours)| HistoricalRecord {
                user_id: "u1".to_string(),
                activity_id,
                log_date: NaiveDate::from_ymd_opt(2026, 2, 23).unwrap(),
                total_hours: hours,
                is_billable: activity_id == 7,
                activity_name: format!("Task {}", activity_id),
                activity_code: format!("T{}", activity_id),
                start_time: None,
            })
            .collect()
    }

    #[test]
    fn test_predict_single() {
        let (p, _) = predictor(&[(7, 1, 0.83)]);
        let candidate = PredictionCandidate::new("u1", 7, target());
        assert_eq!(p.predict_single(&candidate, &history(), None).unwrap(), (1, 0.83));
        assert_eq!(p.stats().total_inferences, 1);
    }

    #[test]
    fn test_predict_batch_is_one_call_in_order() {
        let (p, clf) = predictor(&[(7, 1, 0.9), (3, 0, 0.2)]);
        let candidates: Vec<_> = [3, 7, 5]
            .iter()
            .map(|&id| PredictionCandidate::new("u1", id, target()))
            .collect();

        let scored = p.predict_batch(&candidates, &history(), None).unwrap();
        assert_eq!(*clf.calls.lock().unwrap(), vec![3]);
        let got: Vec<(i64, u8)> = scored.iter().map(|s| (s.candidate.activity_id, s.label)).collect();
        assert_eq!(got, vec![(3, 0), (7, 1), (5, 0)]);
        assert_eq!(scored[1].probability, 0.9);
    }

    #[test]
    fn test_daily_requires_label_and_threshold() {
        // 9 has a high probability but label 0
        let (p, _) = predictor(&[(7, 1, 0.42), (3, 1, 0.8), (9, 0, 0.95)]);

        let results = p
            .predict_daily_timesheet("u1", target(), &[7, 3, 9], &history(), None, 0.5)
            .unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.activity_id).collect();
        assert_eq!(ids, vec![3]);

        let results = p
            .predict_daily_timesheet("u1", target(), &[7, 3, 9], &history(), None, 0.4)
            .unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.activity_id).collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(results[1].confidence, 0.42);
    }

    #[test]
    fn test_daily_threshold_extremes() {
        let (p, _) = predictor(&[(7, 1, 1.0), (3, 1, 0.01), (9, 0, 0.3)]);
        let all = [7, 3, 9];

        let none = p
            .predict_daily_timesheet("u1", target(), &all, &history(), None, 1.01)
            .unwrap();
        assert!(none.is_empty());

        let every = p
            .predict_daily_timesheet("u1", target(), &all, &history(), None, 0.0)
            .unwrap();
        let ids: Vec<i64> = every.iter().map(|r| r.activity_id).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn test_daily_ties_keep_caller_order() {
        let (p, _) = predictor(&[(1, 1, 0.7), (2, 1, 0.9), (3, 1, 0.7), (4, 1, 0.7)]);
        let results = p
            .predict_daily_timesheet("u1", target(), &[4, 1, 2, 3], &[], None, 0.5)
            .unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.activity_id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_daily_enrichment_and_placeholder() {
        let (p, _) = predictor(&[(7, 1, 0.9), (12, 1, 0.6)]);
        let results = p
            .predict_daily_timesheet("u1", target(), &[12, 7], &history(), None, 0.5)
            .unwrap();

        assert_eq!(results[0].activity_id, 7);
        assert_eq!(results[0].activity_name, "Task 7");
        assert_eq!(results[0].activity_code, "T7");
        assert!(results[0].is_billable);
        assert_eq!(results[0].predicted_duration, 5.0);
        assert_eq!(results[0].date, target());

        assert_eq!(results[1].activity_name, "Activity 12");
        assert_eq!(results[1].activity_code, "ACT12");
        assert!(!results[1].is_billable);
        assert_eq!(results[1].predicted_duration, 8.0);
    }

    #[test]
    fn test_daily_scores_each_candidate_individually() {
        let (p, clf) = predictor(&[]);
        p.predict_daily_timesheet("u1", target(), &[1, 2, 3], &[], None, 0.5)
            .unwrap();
        assert_eq!(*clf.calls.lock().unwrap(), vec![1, 1, 1]);
        assert_eq!(p.stats().total_inferences, 3);
    }

    #[test]
    fn test_classifier_output_mismatch_is_error() {
        let p = TimesheetPredictor::new(Arc::new(BrokenClassifier), info());
        let candidate = PredictionCandidate::new("u1", 1, target());
        assert!(matches!(
            p.predict_single(&candidate, &[], None),
            Err(PredictorError::Inference(_))
        ));
    }

    #[test]
    fn test_model_info() {
        let (p, _) = predictor(&[]);
        let info = p.get_model_info();
        assert_eq!(info.model_type, "RandomForestClassifier");
        assert_eq!(info.n_features, 12);
        assert_eq!(info.feature_names[0], "day_of_week_encoded");
    }

    #[test]
    fn test_features_for_candidates() {
        let (p, _) = predictor(&[]);
        let candidates = vec![PredictionCandidate::new("u1", 7, target())];
        let vectors = p.features(&candidates, &history(), None);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].total_occurrences, 2);
        assert_eq!(vectors[0].avg_duration, 5.0);
    }
}
