//! Audit orchestration.
//!
//! The auditor sequences the three pipeline stages over one batch: model
//! training, per-record validation, outlier detection, and scoring. It
//! holds configuration only; all per-batch state (notably the fitted
//! anomaly model) lives inside the single `audit` call, keeping batches
//! independent and testable in isolation.

use crate::Result;
use crate::models::{QualityReport, Record};

use super::config::AuditConfig;
use super::outlier::OutlierDetector;
use super::scorer::score;
use super::validator::validate_record;

/// Orchestrator for the three-stage audit pipeline.
///
/// # Example
/// ```rust,ignore
/// use ehraudit_core::audit::{AuditConfig, Auditor};
///
/// let auditor = Auditor::new(AuditConfig::default());
/// let report = auditor.audit(&batch)?;
/// println!("Completeness: {:.2}%", report.completeness_score);
/// ```
#[derive(Debug, Clone)]
pub struct Auditor {
    config: AuditConfig,
}

impl Auditor {
    /// Creates a new auditor with the given configuration.
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    /// Creates a new auditor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AuditConfig::default())
    }

    /// Returns a reference to the auditor configuration.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Runs the full audit pipeline over one batch.
    ///
    /// Sequence: fit the outlier model on the batch, validate every record,
    /// detect outliers, then score. The final finding list holds validation
    /// findings in record order followed by outlier findings in record
    /// order. A well-formed batch always yields a report; an empty batch
    /// yields the defined all-zero report with accuracy 100.
    ///
    /// # Errors
    /// Returns a configuration error when the audit config fails
    /// validation.
    pub fn audit(&self, batch: &[Record]) -> Result<QualityReport> {
        self.config
            .validate()
            .map_err(|e| crate::error::AuditError::configuration(e.to_string()))?;

        tracing::info!(records = batch.len(), "starting batch audit");

        // Fresh detector per batch: the fitted model is never reused
        let mut detector = OutlierDetector::new(self.config.outlier.clone());
        detector.train(batch);

        let mut findings = Vec::new();
        for record in batch {
            findings.extend(validate_record(record));
        }
        let validation_count = findings.len();

        findings.extend(detector.detect(batch));

        tracing::debug!(
            validation_findings = validation_count,
            outlier_findings = findings.len() - validation_count,
            "audit findings collected"
        );

        Ok(score(batch, findings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::config::OutlierConfig;
    use crate::models::{Demographics, vitals};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn clean_record(patient_id: &str) -> Record {
        let mut vital_signs = BTreeMap::new();
        vital_signs.insert(vitals::SYSTOLIC.to_string(), 120.0);
        vital_signs.insert(vitals::DIASTOLIC.to_string(), 80.0);
        vital_signs.insert(vitals::HEART_RATE.to_string(), 75.0);
        vital_signs.insert(vitals::TEMPERATURE.to_string(), 37.0);
        vital_signs.insert(vitals::RESPIRATORY_RATE.to_string(), 16.0);

        let mut lab_results = BTreeMap::new();
        lab_results.insert("glucose".to_string(), 5.4);

        Record {
            patient_id: patient_id.to_string(),
            timestamp: Utc::now(),
            vital_signs,
            medications: vec!["metformin".to_string()],
            diagnosis_codes: vec!["E11.9".to_string()],
            lab_results,
            demographics: Demographics {
                age: Some(45),
                gender: Some("F".to_string()),
                race: Some("White".to_string()),
            },
            notes: Some("Routine follow-up".to_string()),
        }
    }

    #[test]
    fn test_empty_batch_does_not_raise() {
        let report = Auditor::with_defaults().audit(&[]).unwrap();

        assert_eq!(report.record_count, 0);
        assert_eq!(report.completeness_score, 0.0);
        assert_eq!(report.consistency_score, 0.0);
        assert_eq!(report.accuracy_score, 100.0);
    }

    #[test]
    fn test_clean_singleton_batch_is_perfect() {
        let report = Auditor::with_defaults()
            .audit(&[clean_record("P000001")])
            .unwrap();

        assert!(report.findings.is_empty());
        assert!((report.completeness_score - 100.0).abs() < 0.001);
        assert!((report.consistency_score - 100.0).abs() < 0.001);
        assert!((report.accuracy_score - 100.0).abs() < 0.001);
        assert_eq!(report.record_count, 1);
    }

    #[test]
    fn test_validation_findings_precede_outlier_findings() {
        let mut batch: Vec<Record> = (0..9)
            .map(|i| clean_record(&format!("P{:06}", i)))
            .collect();
        // A record both invalid and extreme
        let mut bad = clean_record("P000099");
        bad.patient_id = "BROKEN".to_string();
        bad.vital_signs.insert(vitals::SYSTOLIC.to_string(), 200.0);
        bad.vital_signs.insert(vitals::HEART_RATE.to_string(), 195.0);
        bad.medications = (0..15).map(|i| format!("drug{}", i)).collect();
        batch.push(bad);

        let report = Auditor::with_defaults().audit(&batch).unwrap();

        let outlier_positions: Vec<usize> = report
            .findings
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field == "record_outlier")
            .map(|(i, _)| i)
            .collect();
        let validation_positions: Vec<usize> = report
            .findings
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field != "record_outlier")
            .map(|(i, _)| i)
            .collect();

        assert!(!validation_positions.is_empty());
        if let (Some(last_validation), Some(first_outlier)) =
            (validation_positions.last(), outlier_positions.first())
        {
            assert!(last_validation < first_outlier);
        }
    }

    #[test]
    fn test_audit_is_deterministic_apart_from_timestamp() {
        let batch: Vec<Record> = (0..10)
            .map(|i| clean_record(&format!("P{:06}", i)))
            .collect();
        let auditor = Auditor::with_defaults();

        let first = auditor.audit(&batch).unwrap();
        let second = auditor.audit(&batch).unwrap();

        assert_eq!(first.findings, second.findings);
        assert_eq!(first.completeness_score, second.completeness_score);
        assert_eq!(first.consistency_score, second.consistency_score);
        assert_eq!(first.accuracy_score, second.accuracy_score);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let auditor = Auditor::new(AuditConfig {
            outlier: OutlierConfig {
                contamination: 2.0,
                ..OutlierConfig::default()
            },
        });

        assert!(auditor.audit(&[clean_record("P000001")]).is_err());
    }

    #[test]
    fn test_bad_record_does_not_abort_batch() {
        let mut batch = vec![clean_record("P000001"), clean_record("P000002")];
        batch[1].patient_id = "???".to_string();
        batch[1].diagnosis_codes = vec!["garbage".to_string()];

        let report = Auditor::with_defaults().audit(&batch).unwrap();

        assert_eq!(report.record_count, 2);
        assert!(!report.findings.is_empty());
        assert!((report.accuracy_score - 50.0).abs() < 0.001);
    }
}
