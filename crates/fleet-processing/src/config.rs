//! Configuration for the preprocessing pipeline.
//!
//! Uses the builder pattern for ergonomic setup and validates thresholds at
//! build time.

use serde::{Deserialize, Serialize};

/// Configuration for the preprocessing pipeline.
///
/// Use [`PreprocessConfig::builder()`] for a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use fleet_processing::config::PreprocessConfig;
///
/// let config = PreprocessConfig::builder()
///     .missing_column_threshold(0.6)
///     .pca_components(50)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Columns with a missing-value fraction strictly above this threshold
    /// are dropped during imputation (0.0 - 1.0).
    /// Default: 0.6 (60%)
    pub missing_column_threshold: f64,

    /// Literal sentinel strings that stand in for missing data in raw files.
    /// Replaced with nulls before any other stage.
    /// Default: `["na", "'na'"]`
    pub invalid_markers: Vec<String>,

    /// Target dimensionality for the PCA projection. Clamped to the number
    /// of surviving feature columns.
    /// Default: 100
    pub pca_components: usize,

    /// Seed for any batch-local randomized fit. Kept so repeated runs over
    /// the same batch produce identical output.
    /// Default: 42
    pub random_state: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            missing_column_threshold: 0.6,
            invalid_markers: vec!["na".to_string(), "'na'".to_string()],
            pca_components: 100,
            random_state: 42,
        }
    }
}

impl PreprocessConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder::default()
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.missing_column_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_column_threshold".to_string(),
                value: self.missing_column_threshold,
            });
        }

        if self.pca_components == 0 {
            return Err(ConfigValidationError::InvalidPcaComponents(
                self.pca_components,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid PCA component count: {0} (must be at least 1)")]
    InvalidPcaComponents(usize),
}

/// Builder for [`PreprocessConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessConfigBuilder {
    missing_column_threshold: Option<f64>,
    invalid_markers: Option<Vec<String>>,
    pca_components: Option<usize>,
    random_state: Option<u64>,
}

impl PreprocessConfigBuilder {
    /// Set the missing-fraction threshold above which a column is dropped.
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.missing_column_threshold = Some(threshold);
        self
    }

    /// Set the sentinel strings treated as missing data.
    pub fn invalid_markers(mut self, markers: Vec<String>) -> Self {
        self.invalid_markers = Some(markers);
        self
    }

    /// Set the PCA target dimensionality.
    pub fn pca_components(mut self, n: usize) -> Self {
        self.pca_components = Some(n);
        self
    }

    /// Set the seed for batch-local fits.
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreprocessConfig` or an error if validation fails.
    pub fn build(self) -> Result<PreprocessConfig, ConfigValidationError> {
        let defaults = PreprocessConfig::default();
        let config = PreprocessConfig {
            missing_column_threshold: self
                .missing_column_threshold
                .unwrap_or(defaults.missing_column_threshold),
            invalid_markers: self.invalid_markers.unwrap_or(defaults.invalid_markers),
            pca_components: self.pca_components.unwrap_or(defaults.pca_components),
            random_state: self.random_state.unwrap_or(defaults.random_state),
        };

        config.validate()?;
        Ok(config)
    }
}
