//! Aggregate scoring of a batch into a quality report.
//!
//! The scorer fuses record-level completeness and coherence checks with the
//! full finding set produced by validation and outlier detection. Coherence
//! here is deliberately separate from the validator's field-level rules:
//! the validator answers "is this field valid in isolation", the scorer
//! answers "does this record hang together".

use std::collections::HashSet;

use chrono::Utc;

use crate::models::{Finding, QualityReport, Record, has_text, vitals};

/// Number of top-level fields counted toward completeness: vital signs,
/// medications, diagnosis codes, lab results, demographics, notes.
const COMPLETENESS_FIELDS: f64 = 6.0;

/// Fraction of the expected top-level fields populated on one record.
///
/// Adding a populated optional field never decreases the result.
fn record_completeness(record: &Record) -> f64 {
    let mut present = 0u32;

    if !record.vital_signs.is_empty() {
        present += 1;
    }
    if !record.medications.is_empty() {
        present += 1;
    }
    if !record.diagnosis_codes.is_empty() {
        present += 1;
    }
    if !record.lab_results.is_empty() {
        present += 1;
    }
    if !record.demographics.is_empty() {
        present += 1;
    }
    if has_text(&record.notes) {
        present += 1;
    }

    f64::from(present) / COMPLETENESS_FIELDS
}

/// Cross-field coherence check for one record.
///
/// A record is consistent iff diastolic BP is below systolic BP and the
/// presence of diagnosis codes implies the presence of medications. A
/// record missing either blood pressure reading, or carrying no diagnosis
/// codes, trivially passes the respective clause.
fn is_record_consistent(record: &Record) -> bool {
    let pressure_ok = match (
        record.vital(vitals::SYSTOLIC),
        record.vital(vitals::DIASTOLIC),
    ) {
        (Some(systolic), Some(diastolic)) => diastolic < systolic,
        _ => true,
    };

    let treatment_ok = record.diagnosis_codes.is_empty() || !record.medications.is_empty();

    pressure_ok && treatment_ok
}

/// Fuses the batch and its findings into the quality report.
///
/// Accuracy is the percentage of records with no findings attributed to
/// them; with no records it is 100 by convention. Finding order is
/// preserved as assembled by the auditor (validation findings in record
/// order, then outlier findings in record order).
pub fn score(records: &[Record], findings: Vec<Finding>) -> QualityReport {
    let record_count = records.len();

    let (completeness_score, consistency_score, accuracy_score) = if record_count == 0 {
        (0.0, 0.0, 100.0)
    } else {
        let total = record_count as f64;

        let completeness =
            records.iter().map(record_completeness).sum::<f64>() / total * 100.0;

        let consistent = records.iter().filter(|r| is_record_consistent(r)).count();
        let consistency = consistent as f64 / total * 100.0;

        let flagged: HashSet<&str> = findings
            .iter()
            .filter(|f| !f.is_valid)
            .filter_map(|f| f.patient_id.as_deref())
            .collect();
        let clean = records
            .iter()
            .filter(|r| !flagged.contains(r.patient_id.as_str()))
            .count();
        let accuracy = clean as f64 / total * 100.0;

        (completeness, consistency, accuracy)
    };

    QualityReport {
        completeness_score,
        consistency_score,
        accuracy_score,
        findings,
        record_count,
        generated_at: Utc::now(),
    }
}
