//! Rule-based validation for individual records.
//!
//! Validation is deterministic and side-effect free: every rule is applied
//! independently per record, with no short-circuiting across rules and no
//! hidden state. Only violations are emitted; the absence of a finding for
//! a field means it passed.

use std::sync::OnceLock;

use crate::models::{Finding, Record, Severity, has_text, vitals};

/// Inclusive plausibility ranges for known vital signs.
///
/// Signs not present on a record are silently skipped, not flagged missing.
const VITAL_SIGN_RANGES: &[(&str, f64, f64)] = &[
    (vitals::SYSTOLIC, 60.0, 200.0),
    (vitals::DIASTOLIC, 40.0, 130.0),
    (vitals::HEART_RATE, 40.0, 200.0),
    (vitals::TEMPERATURE, 35.0, 42.0),
    (vitals::RESPIRATORY_RATE, 8.0, 40.0),
];

/// Compiled validation patterns, initialized once per process.
struct ValidationPatterns {
    patient_id: regex::Regex,
    icd10: regex::Regex,
}

fn patterns() -> &'static ValidationPatterns {
    static PATTERNS: OnceLock<ValidationPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ValidationPatterns {
        patient_id: regex::Regex::new(r"^P\d{6}$").expect("Invalid patient id pattern"),
        icd10: regex::Regex::new(r"^[A-Z]\d{2}(\.\d+)?$").expect("Invalid ICD-10 pattern"),
    })
}

/// Validates a single record against all deterministic rules.
///
/// Rules applied, each independently:
/// 1. Patient identifier format (`P` followed by six digits)
/// 2. Vital signs within their inclusive plausibility ranges
/// 3. Required demographic fields present (age, gender, race)
/// 4. Diagnosis codes in ICD-10-like format
///
/// Validating the same record twice yields identical finding sets.
pub fn validate_record(record: &Record) -> Vec<Finding> {
    let mut findings = Vec::new();

    validate_patient_id(record, &mut findings);
    validate_vital_signs(record, &mut findings);
    validate_demographics(record, &mut findings);
    validate_diagnosis_codes(record, &mut findings);

    findings
}

fn validate_patient_id(record: &Record, findings: &mut Vec<Finding>) {
    if !patterns().patient_id.is_match(&record.patient_id) {
        findings.push(
            Finding::violation(
                "patient_id",
                Severity::High,
                "Patient ID must be in format P followed by 6 digits",
            )
            .for_patient(&record.patient_id),
        );
    }
}

fn validate_vital_signs(record: &Record, findings: &mut Vec<Finding>) {
    for &(name, min, max) in VITAL_SIGN_RANGES {
        if let Some(value) = record.vital(name)
            && !(min..=max).contains(&value)
        {
            findings.push(
                Finding::violation(
                    format!("vital_signs.{}", name),
                    Severity::Medium,
                    format!(
                        "{} value {} is outside normal range ({}-{})",
                        name, value, min, max
                    ),
                )
                .for_patient(&record.patient_id),
            );
        }
    }
}

fn validate_demographics(record: &Record, findings: &mut Vec<Finding>) {
    let demo = &record.demographics;
    let required: [(&str, bool); 3] = [
        ("age", demo.age.is_some()),
        ("gender", has_text(&demo.gender)),
        ("race", has_text(&demo.race)),
    ];

    for (field, present) in required {
        if !present {
            findings.push(
                Finding::violation(
                    format!("demographics.{}", field),
                    Severity::Medium,
                    format!("Missing required demographic field: {}", field),
                )
                .for_patient(&record.patient_id),
            );
        }
    }
}

fn validate_diagnosis_codes(record: &Record, findings: &mut Vec<Finding>) {
    for code in &record.diagnosis_codes {
        if !patterns().icd10.is_match(code) {
            findings.push(
                Finding::violation(
                    "diagnosis_codes",
                    Severity::High,
                    format!("Invalid ICD-10 code format: {}", code),
                )
                .for_patient(&record.patient_id),
            );
        }
    }
}
