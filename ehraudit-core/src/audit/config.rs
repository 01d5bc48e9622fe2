//! Audit configuration.
//!
//! This module provides configuration for the audit pipeline, chiefly the
//! outlier detector's contamination fraction and random seed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default expected fraction of outliers in a batch.
const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Default number of isolation trees in the ensemble.
const DEFAULT_TREES: usize = 100;

/// Default random seed, pinned so `detect` is reproducible given `train`.
const DEFAULT_SEED: u64 = 42;

/// Outlier detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Enable outlier detection
    pub enabled: bool,
    /// Expected fraction of outliers in the batch (0.0, 0.5]
    pub contamination: f64,
    /// Number of isolation trees in the ensemble
    pub trees: usize,
    /// Random seed for reproducible model fitting
    pub seed: u64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contamination: DEFAULT_CONTAMINATION,
            trees: DEFAULT_TREES,
            seed: DEFAULT_SEED,
        }
    }
}

impl OutlierConfig {
    /// Creates a new outlier config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable/disable outlier detection.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the contamination fraction.
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        if !(f64::EPSILON..=0.5).contains(&contamination) {
            tracing::warn!(
                "contamination {} clamped to valid range (0.0, 0.5]",
                contamination
            );
        }
        self.contamination = contamination.clamp(f64::EPSILON, 0.5);
        self
    }

    /// Builder method to set the tree count.
    pub fn with_trees(mut self, trees: usize) -> Self {
        if trees == 0 {
            tracing::warn!("tree count 0 raised to 1");
        }
        self.trees = trees.max(1);
        self
    }

    /// Builder method to set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Validation errors for audit configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("contamination must be in (0.0, 0.5], got {0}")]
    InvalidContamination(f64),
    #[error("tree count must be at least 1")]
    InvalidTreeCount,
}

/// Audit pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Outlier detection settings
    pub outlier: OutlierConfig,
}

impl AuditConfig {
    /// Creates a new audit config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the outlier detection config.
    pub fn with_outlier(mut self, outlier: OutlierConfig) -> Self {
        self.outlier = outlier;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error if the contamination fraction is outside (0.0, 0.5]
    /// or the ensemble is empty.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(f64::EPSILON..=0.5).contains(&self.outlier.contamination) {
            return Err(ConfigValidationError::InvalidContamination(
                self.outlier.contamination,
            ));
        }
        if self.outlier.trees == 0 {
            return Err(ConfigValidationError::InvalidTreeCount);
        }
        Ok(())
    }
}
