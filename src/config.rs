//! Metric configuration and task descriptors.
//!
//! All knobs are explicit construction-time configuration; nothing is read
//! from ambient process-wide state.

use serde::{Deserialize, Serialize};

use crate::error::MetricError;

/// Default classification threshold for ratio-style metrics.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// One logical prediction target scored by a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecTask {
    pub name: String,
}

impl RecTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Construction-time configuration for a metric and its computations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Number of prediction targets; fixes the length of every state vector.
    pub n_tasks: usize,
    /// Window retention bound, in samples (not batches).
    pub window_size: usize,
    /// Classification threshold applied to predictions.
    pub threshold: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            n_tasks: 1,
            window_size: 1024,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MetricConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.n_tasks == 0 {
            return Err(MetricError::InvalidConfiguration(
                "n_tasks must be at least 1".to_string(),
            ));
        }
        if self.window_size == 0 {
            return Err(MetricError::InvalidConfiguration(
                "window_size must be at least 1 sample".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(MetricError::InvalidConfiguration(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Fluent builder for [`MetricConfig`].
pub struct MetricConfigBuilder {
    config: MetricConfig,
}

impl MetricConfigBuilder {
    /// Starts from the default configuration.
    pub fn new() -> Self {
        Self {
            config: MetricConfig::default(),
        }
    }

    /// Set the number of prediction targets.
    pub fn n_tasks(mut self, n_tasks: usize) -> Self {
        self.config.n_tasks = n_tasks;
        self
    }

    /// Set the window retention bound in samples.
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = window_size;
        self
    }

    /// Set the classification threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<MetricConfig, MetricError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for MetricConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
