//! Data model for EHR batch auditing.
//!
//! This module defines the record representation consumed by the audit
//! pipeline and the finding/report structures it produces. Findings carry
//! counts, field paths, and patient identifiers only, never raw clinical
//! values beyond the offending measurement named in the message.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known vital sign names used across validation, feature extraction,
/// and consistency checks.
pub mod vitals {
    /// Systolic blood pressure (mmHg).
    pub const SYSTOLIC: &str = "blood_pressure_systolic";
    /// Diastolic blood pressure (mmHg).
    pub const DIASTOLIC: &str = "blood_pressure_diastolic";
    /// Heart rate (bpm).
    pub const HEART_RATE: &str = "heart_rate";
    /// Body temperature (degrees Celsius).
    pub const TEMPERATURE: &str = "temperature";
    /// Respiratory rate (breaths per minute).
    pub const RESPIRATORY_RATE: &str = "respiratory_rate";
}

/// Severity level for audit findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational issue, unlikely to affect downstream use
    Low,
    /// Issue that degrades data quality but leaves the record usable
    Medium,
    /// Issue that makes the record unreliable (malformed identifiers, codes)
    High,
}

/// Patient demographics attached to a record.
///
/// All fields are optional; absence is meaningful and feeds both the
/// demographic validation rules and the completeness score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    /// Patient age in years
    #[serde(default)]
    pub age: Option<u32>,
    /// Self-reported gender
    #[serde(default)]
    pub gender: Option<String>,
    /// Self-reported race
    #[serde(default)]
    pub race: Option<String>,
}

impl Demographics {
    /// Returns true when no demographic field carries a value.
    ///
    /// Empty strings count as absent, matching the presence definition
    /// used by the completeness score.
    pub fn is_empty(&self) -> bool {
        self.age.is_none() && !has_text(&self.gender) && !has_text(&self.race)
    }
}

/// Returns true when the optional string holds non-empty text.
pub(crate) fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// One patient encounter's structured clinical snapshot.
///
/// Constructed once by the loading adapter and read-only for the remainder
/// of the audit. `patient_id` and `timestamp` are always present; every
/// other field may be partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Patient identifier, expected format `P` followed by six digits
    pub patient_id: String,
    /// Encounter timestamp
    pub timestamp: DateTime<Utc>,
    /// Named numeric vital sign measurements
    #[serde(default)]
    pub vital_signs: BTreeMap<String, f64>,
    /// Ordered medication names, possibly empty
    #[serde(default)]
    pub medications: Vec<String>,
    /// Ordered diagnosis codes in ICD-10-like format
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    /// Named numeric lab results (e.g. glucose, cholesterol)
    #[serde(default)]
    pub lab_results: BTreeMap<String, f64>,
    /// Patient demographics
    #[serde(default)]
    pub demographics: Demographics,
    /// Optional free-text clinical notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Record {
    /// Returns the named vital sign measurement, if recorded.
    pub fn vital(&self, name: &str) -> Option<f64> {
        self.vital_signs.get(name).copied()
    }
}

/// A single validity or anomaly fact about a record or the batch.
///
/// Findings are pure facts; they carry no remediation action. Record-scoped
/// findings reference the record through `patient_id`; batch-scoped findings
/// leave it unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Dotted path identifying the offending field (e.g. `vital_signs.heart_rate`)
    pub field: String,
    /// Whether the checked fact holds
    pub is_valid: bool,
    /// Human-readable description, present when invalid
    pub message: Option<String>,
    /// Severity of the issue
    pub severity: Severity,
    /// Identifier of the record this finding is about, if record-scoped
    pub patient_id: Option<String>,
}

impl Finding {
    /// Creates an invalid finding for the given field.
    pub fn violation(
        field: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            is_valid: false,
            message: Some(message.into()),
            severity,
            patient_id: None,
        }
    }

    /// Attaches the identifier of the record this finding is about.
    pub fn for_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }
}

/// Quality report for one audited batch.
///
/// Produced exactly once per batch by the scorer and immutable thereafter;
/// ownership passes to whichever collaborator renders or persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Mean fraction of expected top-level fields populated, as a percentage
    pub completeness_score: f64,
    /// Percentage of records satisfying the cross-field coherence rules
    pub consistency_score: f64,
    /// Percentage of records free of findings
    pub accuracy_score: f64,
    /// All findings: validation findings in record order, then outlier
    /// findings in record order
    pub findings: Vec<Finding>,
    /// Number of records audited
    pub record_count: usize,
    /// Timestamp when the report was generated
    pub generated_at: DateTime<Utc>,
}
