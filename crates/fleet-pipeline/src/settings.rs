//! Top-level pipeline settings, loaded from a TOML file.
//!
//! Every field has a serde default so a minimal settings file only names
//! the directories that differ from the layout below.

use crate::error::{PipelineError, Result};
use fleet_learning::TrainingConfig;
use fleet_processing::PreprocessConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// JSON schema descriptor for raw files.
    pub schema_path: PathBuf,
    /// Directory holding the incoming raw CSV batch.
    pub input_dir: PathBuf,
    /// Root of the per-run staging areas.
    pub staging_dir: PathBuf,
    /// Bucket directory for the artifact store.
    pub store_dir: PathBuf,
    /// JSON-lines training-run tracking file.
    pub tracking_path: PathBuf,
    /// Name of the label column in training batches.
    pub label_column: String,
    /// Storage key of the persisted partitioner.
    pub partitioner_key: String,
    /// Storage key prefix for per-cluster models.
    pub model_prefix: String,
    /// Storage key of the prediction output artifact.
    pub prediction_key: String,
    /// Rows included in the prediction sample returned to the caller.
    pub sample_rows: usize,
    pub preprocess: PreprocessConfig,
    pub training: TrainingConfig,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("schema_training.json"),
            input_dir: PathBuf::from("data/incoming"),
            staging_dir: PathBuf::from("data/staging"),
            store_dir: PathBuf::from("data/store"),
            tracking_path: PathBuf::from("data/tracking/runs.jsonl"),
            label_column: "class".to_string(),
            partitioner_key: "artifacts/partitioner.json".to_string(),
            model_prefix: "models/".to_string(),
            prediction_key: "predictions/predictions.csv".to_string(),
            sample_rows: 10,
            preprocess: PreprocessConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineSettings {
    /// Load settings from a TOML file and validate the embedded configs.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::storage("load", path.display().to_string(), e))?;
        let settings: PipelineSettings = toml::from_str(&contents).map_err(|e| {
            PipelineError::preprocessing("settings", format!("{}: {e}", path.display()))
        })?;
        settings.validate()?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocess
            .validate()
            .map_err(|e| PipelineError::preprocessing("settings", e))?;
        self.training
            .validate()
            .map_err(|e| PipelineError::preprocessing("settings", e))?;
        if self.sample_rows == 0 {
            return Err(PipelineError::preprocessing(
                "settings",
                "sample_rows must be at least 1",
            ));
        }
        if !self.model_prefix.ends_with('/') {
            return Err(PipelineError::preprocessing(
                "settings",
                "model_prefix must end with '/'",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        PipelineSettings::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: PipelineSettings = toml::from_str(
            r#"
            input_dir = "batches/today"

            [training]
            test_size = 0.25
            random_state = 42
            max_clusters = 5
            min_cluster_rows = 12
            "#,
        )
        .unwrap();

        assert_eq!(settings.input_dir, PathBuf::from("batches/today"));
        assert_eq!(settings.training.max_clusters, 5);
        assert_eq!(settings.label_column, "class");
        assert_eq!(settings.preprocess.missing_column_threshold, 0.6);
    }

    #[test]
    fn test_invalid_embedded_config_is_rejected() {
        let mut settings = PipelineSettings::default();
        settings.training.test_size = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bad_model_prefix_is_rejected() {
        let mut settings = PipelineSettings::default();
        settings.model_prefix = "models".to_string();
        assert!(settings.validate().is_err());
    }
}
