//! Batch loading adapter.
//!
//! Reads a JSON file holding an array of record objects. Rows that fail to
//! deserialize are rejected during load: they are counted, logged, and
//! excluded from both the batch and the audit's record count. They never
//! surface as findings. A file whose top level is not an array is a fatal
//! precondition violation.

use std::path::Path;

use ehraudit_core::error::AuditError;
use ehraudit_core::{Record, Result};

/// Outcome of loading one batch file.
#[derive(Debug)]
pub struct LoadedBatch {
    /// Records that satisfied the field-presence contract
    pub records: Vec<Record>,
    /// Count of rows rejected during load
    pub rejected: usize,
}

/// Loads a batch of records from a JSON file.
///
/// # Errors
/// Returns an error when the file cannot be read or its top level is not a
/// JSON array. Individual malformed rows are skipped, not fatal.
pub fn load_batch(path: &Path) -> Result<LoadedBatch> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AuditError::io(format!("reading batch file {}", path.display()), e))?;

    let rows: Vec<serde_json::Value> = serde_json::from_str(&contents).map_err(|e| {
        AuditError::serialization(
            format!("batch file {} must contain a JSON array", path.display()),
            e,
        )
    })?;

    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0usize;

    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<Record>(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                rejected += 1;
                tracing::warn!(row = index, error = %e, "record rejected during load");
            }
        }
    }

    if rejected > 0 {
        tracing::info!(
            loaded = records.len(),
            rejected,
            "batch loaded with rejected rows"
        );
    }

    Ok(LoadedBatch { records, rejected })
}
