//! Training-run tracking.
//!
//! Stands in for an external experiment tracker: one JSON record per
//! trained cluster, appended to a JSON-lines file. Tracking is
//! fire-and-forget; a failed append is logged and never raised.

use chrono::{DateTime, Utc};
use fleet_learning::{ModelFamily, ModelRecord};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One line in the tracking file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRunRecord {
    pub timestamp: DateTime<Utc>,
    pub cluster_id: u32,
    pub family: ModelFamily,
    pub hyperparameters: serde_json::Value,
    pub validation_score: f64,
    pub trained_rows: usize,
}

/// Appends training-run records to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct RunTracker {
    path: PathBuf,
}

impl RunTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Record one selected model. Failures are logged, never raised.
    pub fn log_run(&self, record: &ModelRecord) {
        let line = TrainingRunRecord {
            timestamp: Utc::now(),
            cluster_id: record.key.cluster_id,
            family: record.key.family,
            hyperparameters: record.hyperparameters.clone(),
            validation_score: record.validation_score,
            trained_rows: record.trained_rows,
        };

        if let Err(e) = self.append(&line) {
            warn!(error = %e, path = %self.path.display(), "tracking append failed, continuing");
        } else {
            debug!(cluster_id = line.cluster_id, "training run tracked");
        }
    }

    fn append(&self, line: &TrainingRunRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(line)?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}
