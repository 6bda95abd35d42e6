//! The prediction orchestrator.
//!
//! A new batch flows through the exact same validation and preprocessing as
//! training, is routed by the reloaded partitioner (assignment only, never
//! a refit), and each cluster's rows are scored by that cluster's persisted
//! model. A cluster with no matching model aborts the run before any output
//! is written.

use crate::error::{PipelineError, Result};
use crate::settings::PipelineSettings;
use crate::staging::{StagingArea, frame_to_csv_bytes, load_raw_batch, report_rejections};
use crate::store::{ArtifactStore, Probe};
use fleet_learning::{KMeansPartitioner, ModelKey, ModelRecord};
use fleet_processing::{Preprocessor, SchemaDescriptor, SchemaValidator, decode_label};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// What one prediction run produced.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    /// Where the artifact lives (the store's bucket location).
    pub output_location: String,
    /// Storage key of the written predictions artifact.
    pub output_key: String,
    /// Head of the predictions, serialized as JSON records.
    pub sample_json: String,
}

pub struct PredictPipeline<S: ArtifactStore> {
    settings: PipelineSettings,
    store: S,
    /// Human-readable location reported in the outcome.
    location: String,
}

impl<S: ArtifactStore> PredictPipeline<S> {
    pub fn new(settings: PipelineSettings, store: S, location: impl Into<String>) -> Self {
        Self {
            settings,
            store,
            location: location.into(),
        }
    }

    pub fn run(&self) -> Result<PredictionOutcome> {
        info!("prediction run started");

        // Identical validation and preprocessing to the training path.
        let descriptor = SchemaDescriptor::from_file(&self.settings.schema_path)
            .map_err(|e| {
                PipelineError::storage(
                    "load",
                    self.settings.schema_path.display().to_string(),
                    e,
                )
            })?;
        let batch = load_raw_batch(&self.settings.input_dir)?;
        let validator = SchemaValidator::new(
            descriptor,
            self.settings.preprocess.invalid_markers.clone(),
        );
        let (accepted, manifest) = validator.validate_batch(batch);
        report_rejections(&manifest);
        if accepted.is_empty() {
            return Err(PipelineError::preprocessing(
                "validation",
                "no file in the batch passed schema validation",
            ));
        }

        let staging = StagingArea::new(self.settings.staging_dir.join("predict"));
        staging.stage(&accepted, &manifest)?;
        let master = staging.merge_master(&accepted)?;

        let preprocessor = Preprocessor::new(self.settings.preprocess.clone());
        let outcome = preprocessor
            .run(master.clone(), None)
            .map_err(|e| PipelineError::preprocessing("preprocess", e))?;
        let x = fleet_learning::frame_to_array(&outcome.features)
            .map_err(|e| PipelineError::preprocessing("matrix_extraction", e))?;

        // Route rows with the persisted partitioner.
        let partitioner_bytes = self.store.load(&self.settings.partitioner_key)?;
        let partitioner = KMeansPartitioner::from_bytes(&partitioner_bytes)
            .map_err(|e| PipelineError::storage("load", &self.settings.partitioner_key, e))?;
        let assignments = partitioner
            .assign(&x)
            .map_err(|e| PipelineError::preprocessing("cluster_assignment", e))?;

        // Resolve every incoming cluster id to a model before any
        // inference; a missing model is fatal and nothing gets written.
        let available = self.persisted_keys()?;
        let mut cluster_rows: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (row, &cluster_id) in assignments.iter().enumerate() {
            cluster_rows.entry(cluster_id).or_default().push(row as u32);
        }
        let mut routed: Vec<(u32, Vec<u32>, ModelRecord)> = Vec::new();
        for (&cluster_id, rows) in &cluster_rows {
            let key = available
                .get(&cluster_id)
                .ok_or(PipelineError::ClusterRoutingFailure { cluster_id })?;
            let bytes = self.store.load(key)?;
            let record = ModelRecord::from_bytes(&bytes)
                .map_err(|e| PipelineError::storage("load", key.clone(), e))?;
            routed.push((cluster_id, rows.clone(), record));
        }

        // Per-cluster inference, collected in id order and concatenated
        // once after every cluster succeeded.
        let mut cluster_frames = Vec::with_capacity(routed.len());
        for (cluster_id, rows, record) in &routed {
            let cx = select_rows(&x, rows);
            let labels: Vec<&str> = record
                .model
                .predict(&cx)
                .into_iter()
                .map(decode_label)
                .collect();

            let idx = IdxCa::from_vec("idx".into(), rows.clone());
            let mut frame = master
                .take(&idx)
                .map_err(|e| PipelineError::preprocessing("row_selection", e))?;
            frame
                .with_column(Column::new("prediction".into(), labels))
                .map_err(|e| PipelineError::preprocessing("prediction_join", e))?;
            info!(
                cluster_id,
                rows = frame.height(),
                family = %record.key.family,
                "cluster scored"
            );
            cluster_frames.push(frame);
        }

        let mut output = cluster_frames
            .split_first()
            .map(|(head, tail)| {
                tail.iter().try_fold(head.clone(), |acc, f| acc.vstack(f))
            })
            .ok_or_else(|| {
                PipelineError::preprocessing("prediction_join", "no rows to score")
            })?
            .map_err(|e| PipelineError::preprocessing("prediction_join", e))?;

        // Remove any prior output explicitly before writing.
        match self.store.probe(&self.settings.prediction_key)? {
            Probe::Found => self.store.delete(&self.settings.prediction_key)?,
            Probe::NotFound => {}
        }
        let bytes = frame_to_csv_bytes(&mut output)?;
        self.store.save(&self.settings.prediction_key, &bytes)?;

        let sample_json = sample_records(&output, self.settings.sample_rows)?;
        info!(
            rows = output.height(),
            key = %self.settings.prediction_key,
            "prediction run finished"
        );

        Ok(PredictionOutcome {
            output_location: self.location.clone(),
            output_key: self.settings.prediction_key.clone(),
            sample_json,
        })
    }

    /// Map of cluster id to the storage key of its persisted model, parsed
    /// strictly from the store listing.
    fn persisted_keys(&self) -> Result<BTreeMap<u32, String>> {
        let mut map = BTreeMap::new();
        for key in self.store.list(&self.settings.model_prefix)? {
            let Some(name) = key.strip_prefix(&self.settings.model_prefix) else {
                continue;
            };
            match ModelKey::parse(name) {
                Ok(parsed) => {
                    map.insert(parsed.cluster_id, key);
                }
                Err(e) => {
                    warn!(key, error = %e, "ignoring unparseable artifact in model store");
                }
            }
        }
        Ok(map)
    }
}

fn select_rows(x: &Array2<f64>, rows: &[u32]) -> Array2<f64> {
    let idx: Vec<usize> = rows.iter().map(|&r| r as usize).collect();
    x.select(ndarray::Axis(0), &idx)
}

/// First `n` rows serialized as JSON records.
fn sample_records(df: &DataFrame, n: usize) -> Result<String> {
    let head = df.head(Some(n));
    let mut records = Vec::with_capacity(head.height());
    for row in 0..head.height() {
        let mut record = serde_json::Map::new();
        for column in head.get_columns() {
            let value = column
                .get(row)
                .map_err(|e| PipelineError::preprocessing("sample_serialization", e))?;
            record.insert(column.name().to_string(), any_value_to_json(&value));
        }
        records.push(serde_json::Value::Object(record));
    }
    serde_json::to_string(&records)
        .map_err(|e| PipelineError::preprocessing("sample_serialization", e))
}

fn any_value_to_json(value: &AnyValue<'_>) -> serde_json::Value {
    match value {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Boolean(b) => serde_json::Value::Bool(*b),
        AnyValue::String(s) => serde_json::Value::String((*s).to_string()),
        AnyValue::StringOwned(s) => serde_json::Value::String(s.to_string()),
        AnyValue::Float64(f) => serde_json::json!(f),
        AnyValue::Float32(f) => serde_json::json!(f),
        AnyValue::Int64(i) => serde_json::json!(i),
        AnyValue::Int32(i) => serde_json::json!(i),
        AnyValue::UInt32(i) => serde_json::json!(i),
        AnyValue::UInt64(i) => serde_json::json!(i),
        other => serde_json::Value::String(other.to_string()),
    }
}
