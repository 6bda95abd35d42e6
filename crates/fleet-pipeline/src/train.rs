//! The training orchestrator.
//!
//! Gate order is fixed: validate → stage → merge → preprocess → cluster →
//! per-cluster fit → persist. Nothing is persisted before its preceding
//! stage fully succeeds, and a rerun overwrites artifacts at the same keys.

use crate::error::{PipelineError, Result};
use crate::settings::PipelineSettings;
use crate::staging::{StagingArea, load_raw_batch, report_rejections};
use crate::store::ArtifactStore;
use crate::tracking::RunTracker;
use fleet_learning::{ClusterTuner, ModelKey, fit_with_elbow};
use fleet_processing::{
    Preprocessor, SchemaDescriptor, SchemaValidator, encode_label_series,
};
use ndarray::{Array1, Array2, Axis};
use tracing::{info, warn};

/// What one training run produced, in cluster-id order.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub cluster_count: usize,
    /// Keys of the models persisted this run.
    pub trained: Vec<ModelKey>,
    /// Clusters skipped with the reason, reported but non-fatal.
    pub skipped: Vec<(u32, String)>,
}

/// Per-cluster result, collected in order and assembled after every
/// cluster has been visited.
#[derive(Debug, Clone)]
enum ClusterOutcome {
    Trained(ModelKey),
    Skipped(u32, String),
}

pub struct TrainPipeline<S: ArtifactStore> {
    settings: PipelineSettings,
    store: S,
    tracker: RunTracker,
}

impl<S: ArtifactStore> TrainPipeline<S> {
    pub fn new(settings: PipelineSettings, store: S) -> Self {
        let tracker = RunTracker::new(&settings.tracking_path);
        Self {
            settings,
            store,
            tracker,
        }
    }

    pub fn run(&self) -> Result<TrainingOutcome> {
        info!("training run started");

        // Validation and staging.
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

        let staging = StagingArea::new(self.settings.staging_dir.join("train"));
        staging.stage(&accepted, &manifest)?;
        let master = staging.merge_master(&accepted)?;

        // Preprocess the master table with the label separated internally.
        let preprocessor = Preprocessor::new(self.settings.preprocess.clone());
        let outcome = preprocessor
            .run(master, Some(&self.settings.label_column))
            .map_err(|e| PipelineError::preprocessing("preprocess", e))?;
        let label = outcome.label.as_ref().ok_or_else(|| {
            PipelineError::preprocessing(
                "preprocess",
                format!("label column '{}' missing", self.settings.label_column),
            )
        })?;
        let y = Array1::from_vec(
            encode_label_series(label)
                .map_err(|e| PipelineError::preprocessing("label_encoding", e))?,
        );
        let x = fleet_learning::frame_to_array(&outcome.features)
            .map_err(|e| PipelineError::preprocessing("matrix_extraction", e))?;

        // Segment the feature space and persist the routing artifacts.
        let clustering = fit_with_elbow(
            &x,
            self.settings.training.max_clusters,
            self.settings.training.random_state,
        )
        .map_err(|e| PipelineError::preprocessing("clustering", e))?;
        let k = clustering.partitioner.k();
        info!(clusters = k, rows = x.nrows(), "feature space segmented");

        let partitioner_bytes = clustering
            .partitioner
            .to_bytes()
            .map_err(|e| PipelineError::storage("save", &self.settings.partitioner_key, e))?;
        self.store
            .save(&self.settings.partitioner_key, &partitioner_bytes)?;
        let assignment_bytes = serde_json::to_vec(&clustering.assignments)
            .map_err(|e| PipelineError::storage("save", "artifacts/assignments.json", e))?;
        self.store
            .save("artifacts/assignments.json", &assignment_bytes)?;

        // Train each cluster in id order; failures are isolated.
        let tuner = ClusterTuner::new(self.settings.training.clone());
        let mut outcomes = Vec::with_capacity(k);
        for cluster_id in 0..k as u32 {
            outcomes.push(self.train_cluster(
                &tuner,
                cluster_id,
                &x,
                &y,
                &clustering.assignments,
            )?);
        }

        let mut trained = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                ClusterOutcome::Trained(key) => trained.push(key),
                ClusterOutcome::Skipped(id, reason) => skipped.push((id, reason)),
            }
        }

        info!(
            clusters = k,
            trained = trained.len(),
            skipped = skipped.len(),
            "training run finished"
        );
        Ok(TrainingOutcome {
            cluster_count: k,
            trained,
            skipped,
        })
    }

    fn train_cluster(
        &self,
        tuner: &ClusterTuner,
        cluster_id: u32,
        x: &Array2<f64>,
        y: &Array1<u8>,
        assignments: &[u32],
    ) -> Result<ClusterOutcome> {
        let idx: Vec<usize> = assignments
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a == cluster_id)
            .map(|(i, _)| i)
            .collect();
        let cx = x.select(Axis(0), &idx);
        let cy = Array1::from_iter(idx.iter().map(|&i| y[i]));

        match tuner.tune_cluster(cluster_id, &cx, &cy) {
            Ok(record) => {
                // Persist only after the full fit/score cycle succeeded.
                let key = format!("{}{}", self.settings.model_prefix, record.key.storage_key());
                let bytes = record
                    .to_bytes()
                    .map_err(|e| PipelineError::storage("save", &key, e))?;
                self.store.save(&key, &bytes)?;
                // A previous run may have picked the other family for this
                // cluster; remove the stale artifact so routing stays
                // unambiguous.
                for family in fleet_learning::ModelFamily::ALL {
                    if family != record.key.family {
                        let stale = ModelKey::new(cluster_id, family);
                        self.store.delete(&format!(
                            "{}{}",
                            self.settings.model_prefix,
                            stale.storage_key()
                        ))?;
                    }
                }
                self.tracker.log_run(&record);
                Ok(ClusterOutcome::Trained(record.key))
            }
            Err(e) if e.is_cluster_local() => {
                let failure = PipelineError::ModelFitFailure {
                    cluster_id,
                    reason: e.to_string(),
                };
                warn!(code = failure.error_code(), "{failure}");
                Ok(ClusterOutcome::Skipped(cluster_id, failure.to_string()))
            }
            Err(e) => Err(PipelineError::preprocessing("model_training", e)),
        }
    }
}
