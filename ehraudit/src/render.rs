//! Report rendering.
//!
//! All textual formatting of a quality report lives here, outside the core
//! pipeline. The text format groups issues by severity, highest first.

use std::fmt::Write as _;

use ehraudit_core::error::AuditError;
use ehraudit_core::models::{QualityReport, Severity};
use ehraudit_core::Result;

/// Renders a quality report as a human-readable text summary.
pub fn render_text(report: &QualityReport) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "EHR Data Quality Report");
    let _ = writeln!(out, "----------------------");
    let _ = writeln!(out, "Generated at: {}", report.generated_at.to_rfc3339());
    let _ = writeln!(out, "Records Analyzed: {}", report.record_count);
    let _ = writeln!(out);
    let _ = writeln!(out, "Quality Scores:");
    let _ = writeln!(out, "- Completeness: {:.2}%", report.completeness_score);
    let _ = writeln!(out, "- Consistency: {:.2}%", report.consistency_score);
    let _ = writeln!(out, "- Accuracy: {:.2}%", report.accuracy_score);

    let issues: Vec<_> = report.findings.iter().filter(|f| !f.is_valid).collect();
    if issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No validation issues found.");
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Validation Issues:");
    for severity in [Severity::High, Severity::Medium, Severity::Low] {
        let group: Vec<_> = issues.iter().filter(|f| f.severity == severity).collect();
        if group.is_empty() {
            continue;
        }

        let label = match severity {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "{} Severity Issues:", label);
        for finding in group {
            let _ = writeln!(
                out,
                "- {}: {}",
                finding.field,
                finding.message.as_deref().unwrap_or("(no message)")
            );
        }
    }

    out
}

/// Renders a quality report as pretty-printed JSON.
pub fn render_json(report: &QualityReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| AuditError::serialization("rendering quality report", e))
}
