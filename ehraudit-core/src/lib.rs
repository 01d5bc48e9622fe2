//! Core audit pipeline and data structures for ehraudit.
//!
//! This crate implements a three-stage data quality audit over batches of
//! electronic health records: rule-based validation, per-batch multivariate
//! outlier detection, and aggregate scoring into a quality report.
//!
//! # Architecture
//! - Records are immutable for the duration of an audit
//! - Rule violations are findings, never errors
//! - The anomaly model is retrained per batch and never persisted
//! - All computation is synchronous and in-memory

pub mod audit;
pub mod error;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use audit::{AuditConfig, Auditor, OutlierConfig, OutlierDetector, validate_record};
pub use error::{AuditError, Result};
pub use models::{Demographics, Finding, QualityReport, Record, Severity};
