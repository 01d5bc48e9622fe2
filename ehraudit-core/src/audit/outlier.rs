//! Population-relative outlier detection over one batch.
//!
//! A batch-trained isolation forest captures multivariate co-deviation
//! (e.g. high heart rate combined with low temperature) that independent
//! range checks cannot express. The model is a per-batch value: it is
//! fitted on each audit run and never persisted.
//!
//! # Known limitation
//! Missing vital signs default to 0.0 in the feature vector. Zero is a
//! valid-looking value that can suppress true anomalies or manufacture
//! false ones; the behavior is kept for compatibility with the original
//! feature ordering contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Finding, Record, Severity, vitals};

use super::config::OutlierConfig;

/// Number of features extracted per record, in fixed order.
pub const FEATURE_COUNT: usize = 6;

/// Batches below this size leave the detector untrained.
const MIN_TRAINING_RECORDS: usize = 2;

/// Per-tree subsample cap, following the standard isolation forest setup.
const MAX_SUBSAMPLE: usize = 256;

/// Euler-Mascheroni constant, used in the average path length estimate.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

type FeatureVector = [f64; FEATURE_COUNT];

/// Extracts the fixed-order numeric feature vector for one record.
///
/// Order: systolic BP, diastolic BP, heart rate, temperature, medication
/// count, diagnosis-code count. Missing vitals default to 0.0.
fn extract_features(record: &Record) -> FeatureVector {
    [
        record.vital(vitals::SYSTOLIC).unwrap_or(0.0),
        record.vital(vitals::DIASTOLIC).unwrap_or(0.0),
        record.vital(vitals::HEART_RATE).unwrap_or(0.0),
        record.vital(vitals::TEMPERATURE).unwrap_or(0.0),
        record.medications.len() as f64,
        record.diagnosis_codes.len() as f64,
    ]
}

/// One node of an isolation tree.
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        size: usize,
    },
}

impl TreeNode {
    fn grow(points: &[FeatureVector], depth: usize, limit: usize, rng: &mut StdRng) -> Self {
        if depth >= limit || points.len() <= 1 {
            return TreeNode::Leaf { size: points.len() };
        }

        // Only features with spread can separate points
        let mut splittable: Vec<(usize, f64, f64)> = Vec::new();
        for feature in 0..FEATURE_COUNT {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for point in points {
                min = min.min(point[feature]);
                max = max.max(point[feature]);
            }
            if max > min {
                splittable.push((feature, min, max));
            }
        }

        if splittable.is_empty() {
            return TreeNode::Leaf { size: points.len() };
        }

        let (feature, min, max) = splittable[rng.random_range(0..splittable.len())];
        let threshold = rng.random_range(min..max);

        let (left, right): (Vec<FeatureVector>, Vec<FeatureVector>) =
            points.iter().copied().partition(|p| p[feature] < threshold);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(TreeNode::grow(&left, depth + 1, limit, rng)),
            right: Box::new(TreeNode::grow(&right, depth + 1, limit, rng)),
        }
    }

    fn path_length(&self, point: &FeatureVector, depth: f64) -> f64 {
        match self {
            TreeNode::Leaf { size } => depth + average_path_length(*size),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if point[*feature] < *threshold {
                    left.path_length(point, depth + 1.0)
                } else {
                    right.path_length(point, depth + 1.0)
                }
            }
        }
    }
}

/// Average unsuccessful-search depth in a BST of `n` points, the standard
/// normalization term for isolation forest path lengths.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// An isolation forest fitted over one batch's feature matrix.
struct IsolationForest {
    trees: Vec<TreeNode>,
    subsample: usize,
}

impl IsolationForest {
    fn fit(features: &[FeatureVector], config: &OutlierConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let subsample = features.len().min(MAX_SUBSAMPLE);
        let depth_limit = (subsample as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..config.trees)
            .map(|_| {
                let sample: Vec<FeatureVector> = if features.len() <= subsample {
                    features.to_vec()
                } else {
                    rand::seq::index::sample(&mut rng, features.len(), subsample)
                        .into_iter()
                        .map(|i| features[i])
                        .collect()
                };
                TreeNode::grow(&sample, 0, depth_limit, &mut rng)
            })
            .collect();

        Self { trees, subsample }
    }

    /// Anomaly score in (0, 1]; higher means more isolated.
    fn score(&self, point: &FeatureVector) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point, 0.0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.subsample);
        if normalizer <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / normalizer)
    }
}

/// Unsupervised multivariate anomaly detector, stateful only within one
/// batch's lifetime.
///
/// `train` must be called with the same or a superset of records before
/// `detect`; the auditor constructs a fresh detector per batch.
pub struct OutlierDetector {
    config: OutlierConfig,
    forest: Option<IsolationForest>,
}

impl OutlierDetector {
    /// Creates an untrained detector with the given configuration.
    pub fn new(config: OutlierConfig) -> Self {
        Self {
            config,
            forest: None,
        }
    }

    /// Fits the anomaly model over the batch's feature matrix.
    ///
    /// Batches smaller than the minimum viable training size, and disabled
    /// configurations, leave the detector untrained; `detect` then reports
    /// no anomalies rather than failing.
    pub fn train(&mut self, batch: &[Record]) {
        if !self.config.enabled {
            tracing::debug!("outlier detection disabled by configuration");
            self.forest = None;
            return;
        }
        if batch.len() < MIN_TRAINING_RECORDS {
            tracing::debug!(
                records = batch.len(),
                "batch below minimum viable training size, skipping model fit"
            );
            self.forest = None;
            return;
        }

        let features: Vec<FeatureVector> = batch.iter().map(extract_features).collect();
        self.forest = Some(IsolationForest::fit(&features, &self.config));
        tracing::debug!(
            records = batch.len(),
            trees = self.config.trees,
            "isolation forest fitted"
        );
    }

    /// Scores each record against the trained model and flags outliers.
    ///
    /// A record is flagged when its anomaly score strictly exceeds the
    /// `(1 - contamination)` quantile of the batch's scores, so a fully
    /// homogeneous batch produces no findings. An untrained detector
    /// reports nothing.
    pub fn detect(&self, batch: &[Record]) -> Vec<Finding> {
        let Some(forest) = &self.forest else {
            tracing::debug!("detector untrained, reporting no anomalies");
            return Vec::new();
        };
        if batch.is_empty() {
            return Vec::new();
        }

        let scores: Vec<f64> = batch
            .iter()
            .map(|record| forest.score(&extract_features(record)))
            .collect();

        let threshold = score_threshold(&scores, self.config.contamination);

        batch
            .iter()
            .zip(&scores)
            .filter(|&(_, &score)| score > threshold)
            .map(|(record, _)| {
                Finding::violation(
                    "record_outlier",
                    Severity::Medium,
                    format!(
                        "Record {} identified as potential outlier",
                        record.patient_id
                    ),
                )
                .for_patient(&record.patient_id)
            })
            .collect()
    }
}

/// Score value that the expected inlier fraction of the batch stays at or
/// below. Records must strictly exceed it to be flagged.
fn score_threshold(scores: &[f64], contamination: f64) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let inliers = ((1.0 - contamination) * sorted.len() as f64).ceil() as usize;
    let index = inliers.clamp(1, sorted.len()) - 1;
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Demographics;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(patient_id: &str, systolic: f64, diastolic: f64, heart_rate: f64) -> Record {
        let mut vital_signs = BTreeMap::new();
        vital_signs.insert(vitals::SYSTOLIC.to_string(), systolic);
        vital_signs.insert(vitals::DIASTOLIC.to_string(), diastolic);
        vital_signs.insert(vitals::HEART_RATE.to_string(), heart_rate);
        vital_signs.insert(vitals::TEMPERATURE.to_string(), 37.0);

        Record {
            patient_id: patient_id.to_string(),
            timestamp: Utc::now(),
            vital_signs,
            medications: vec!["aspirin".to_string()],
            diagnosis_codes: vec!["I10".to_string()],
            lab_results: BTreeMap::new(),
            demographics: Demographics::default(),
            notes: None,
        }
    }

    fn normal_batch(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                record(
                    &format!("P{:06}", i),
                    118.0 + i as f64,
                    78.0 + (i % 3) as f64,
                    72.0 + (i % 5) as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_feature_extraction_defaults_missing_vitals_to_zero() {
        let mut rec = record("P000001", 120.0, 80.0, 75.0);
        rec.vital_signs.clear();
        rec.medications = vec!["a".to_string(), "b".to_string()];
        rec.diagnosis_codes = vec!["I10".to_string()];

        assert_eq!(extract_features(&rec), [0.0, 0.0, 0.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn test_feature_extraction_order() {
        let rec = record("P000001", 120.0, 80.0, 75.0);
        let features = extract_features(&rec);

        assert_eq!(features[0], 120.0);
        assert_eq!(features[1], 80.0);
        assert_eq!(features[2], 75.0);
        assert_eq!(features[3], 37.0);
        assert_eq!(features[4], 1.0);
        assert_eq!(features[5], 1.0);
    }

    #[test]
    fn test_average_path_length_degenerate() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert!(average_path_length(2) > 0.0);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_detect_without_train_reports_nothing() {
        let detector = OutlierDetector::new(OutlierConfig::default());
        assert!(detector.detect(&normal_batch(10)).is_empty());
    }

    #[test]
    fn test_singleton_batch_never_flagged() {
        let batch = normal_batch(1);
        let mut detector = OutlierDetector::new(OutlierConfig::default());
        detector.train(&batch);

        assert!(detector.detect(&batch).is_empty());
    }

    #[test]
    fn test_homogeneous_batch_produces_no_findings() {
        let batch: Vec<Record> = (0..8)
            .map(|i| record(&format!("P{:06}", i), 120.0, 80.0, 75.0))
            .collect();

        let mut detector = OutlierDetector::new(OutlierConfig::default());
        detector.train(&batch);

        assert!(detector.detect(&batch).is_empty());
    }

    #[test]
    fn test_extreme_record_flagged() {
        let mut batch = normal_batch(9);
        let mut extreme = record("P000099", 200.0, 40.0, 195.0);
        extreme.medications = (0..12).map(|i| format!("drug{}", i)).collect();
        extreme.diagnosis_codes = (0..9).map(|i| format!("A{:02}", i)).collect();
        batch.push(extreme);

        let mut detector = OutlierDetector::new(OutlierConfig::default());
        detector.train(&batch);
        let findings = detector.detect(&batch);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "record_outlier");
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].patient_id.as_deref(), Some("P000099"));
        assert!(
            findings[0]
                .message
                .as_deref()
                .unwrap()
                .contains("P000099")
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut batch = normal_batch(9);
        batch.push(record("P000099", 195.0, 45.0, 190.0));

        let mut first = OutlierDetector::new(OutlierConfig::default());
        first.train(&batch);
        let mut second = OutlierDetector::new(OutlierConfig::default());
        second.train(&batch);

        assert_eq!(first.detect(&batch), second.detect(&batch));
    }

    #[test]
    fn test_disabled_config_skips_detection() {
        let mut batch = normal_batch(9);
        batch.push(record("P000099", 200.0, 40.0, 195.0));

        let config = OutlierConfig::new().with_enabled(false);
        let mut detector = OutlierDetector::new(config);
        detector.train(&batch);

        assert!(detector.detect(&batch).is_empty());
    }

    #[test]
    fn test_score_threshold_quantile() {
        let scores = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        // 90% inliers of 10 scores: threshold at the 9th smallest
        let threshold = score_threshold(&scores, 0.1);
        assert!((threshold - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_threshold_singleton() {
        let threshold = score_threshold(&[0.7], 0.1);
        assert!((threshold - 0.7).abs() < f64::EPSILON);
    }
}
