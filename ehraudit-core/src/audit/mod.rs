//! Three-stage EHR batch audit pipeline.
//!
//! This module provides the audit capabilities of the crate:
//! - **Validation**: deterministic per-record rule checking
//! - **Outlier Detection**: batch-trained multivariate anomaly flagging
//! - **Scoring**: fusion into completeness/consistency/accuracy metrics
//!
//! The pipeline is single-threaded and synchronous; each audit run owns its
//! own detector instance and no state crosses batch boundaries.
//!
//! # Example
//! ```rust,ignore
//! use ehraudit_core::audit::{AuditConfig, Auditor};
//!
//! let auditor = Auditor::new(AuditConfig::default());
//! let report = auditor.audit(&batch)?;
//! println!("Accuracy: {:.2}%", report.accuracy_score);
//! ```

mod auditor;
mod config;
mod outlier;
mod scorer;
mod validator;

// Re-export public API
pub use auditor::Auditor;
pub use config::{AuditConfig, ConfigValidationError, OutlierConfig};
pub use outlier::{FEATURE_COUNT, OutlierDetector};
pub use scorer::score;
pub use validator::validate_record;
