//! Configuration for clustering and model training.

use serde::{Deserialize, Serialize};

/// Configuration for the training side of the pipeline.
///
/// Use [`TrainingConfig::builder()`] for a fluent API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of each cluster held out for scoring (0.0 - 1.0, exclusive).
    /// Default: 0.33
    pub test_size: f64,

    /// Seed for every randomized fit: splits, KMeans init, tree ensembles.
    /// Fixed so runs are reproducible.
    /// Default: 42
    pub random_state: u64,

    /// Inclusive upper bound of the candidate cluster counts scanned for the
    /// elbow. The scan always starts at 1.
    /// Default: 10
    pub max_clusters: usize,

    /// Clusters with fewer rows than this are skipped (reported, non-fatal).
    /// Ten rows keeps at least a couple of held-out rows at the default
    /// test size.
    /// Default: 10
    pub min_cluster_rows: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.33,
            random_state: 42,
            max_clusters: 10,
            min_cluster_rows: 10,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration builder.
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidTestSize(self.test_size));
        }
        if self.max_clusters == 0 {
            return Err(ConfigValidationError::InvalidMaxClusters(self.max_clusters));
        }
        if self.min_cluster_rows < 4 {
            return Err(ConfigValidationError::InvalidMinClusterRows(
                self.min_cluster_rows,
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid test_size: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidTestSize(f64),

    #[error("Invalid max_clusters: {0} (must be at least 1)")]
    InvalidMaxClusters(usize),

    #[error("Invalid min_cluster_rows: {0} (must be at least 4)")]
    InvalidMinClusterRows(usize),
}

/// Builder for [`TrainingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct TrainingConfigBuilder {
    test_size: Option<f64>,
    random_state: Option<u64>,
    max_clusters: Option<usize>,
    min_cluster_rows: Option<usize>,
}

impl TrainingConfigBuilder {
    /// Set the held-out fraction per cluster.
    pub fn test_size(mut self, fraction: f64) -> Self {
        self.test_size = Some(fraction);
        self
    }

    /// Set the seed for randomized fits.
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Set the largest candidate cluster count for the elbow scan.
    pub fn max_clusters(mut self, k: usize) -> Self {
        self.max_clusters = Some(k);
        self
    }

    /// Set the minimum rows a cluster needs to be trained.
    pub fn min_cluster_rows(mut self, rows: usize) -> Self {
        self.min_cluster_rows = Some(rows);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<TrainingConfig, ConfigValidationError> {
        let defaults = TrainingConfig::default();
        let config = TrainingConfig {
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_state: self.random_state.unwrap_or(defaults.random_state),
            max_clusters: self.max_clusters.unwrap_or(defaults.max_clusters),
            min_cluster_rows: self.min_cluster_rows.unwrap_or(defaults.min_cluster_rows),
        };

        config.validate()?;
        Ok(config)
    }
}
