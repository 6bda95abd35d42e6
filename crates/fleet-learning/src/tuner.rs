//! Per-cluster model selection.
//!
//! For each cluster the tuner runs a bounded grid search over both
//! classifier families on a seeded train/test split, scores every candidate
//! on the held-out rows, and keeps the single best model. Scoring falls
//! back from accuracy to a probability-based score when the held-out rows
//! contain only one class.

use crate::config::TrainingConfig;
use crate::data::{distinct_labels, train_test_split};
use crate::error::{LearningError, Result};
use crate::metrics::{accuracy, mean_true_class_probability};
use crate::models::{
    AdaBoostClassifier, AdaBoostParams, ForestParams, ModelFamily, ModelKey, ModelRecord,
    RandomForestClassifier, TrainedModel,
};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

const FOREST_ESTIMATOR_GRID: [usize; 2] = [50, 100];
const FOREST_DEPTH_GRID: [usize; 2] = [5, 10];
const ADABOOST_ESTIMATOR_GRID: [usize; 2] = [50, 100];
const ADABOOST_LEARNING_RATE_GRID: [f64; 2] = [0.5, 1.0];

/// One scored candidate from the grid.
struct Candidate {
    model: TrainedModel,
    score: f64,
    hyperparameters: serde_json::Value,
}

/// The tuner for one run. Holds the shared split/seed configuration; the
/// per-cluster state lives in the arguments.
#[derive(Debug, Clone)]
pub struct ClusterTuner {
    config: TrainingConfig,
}

impl ClusterTuner {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Tune one cluster: split, grid-search both families, keep the best.
    ///
    /// Returns `ClusterTooSmall` when the cluster cannot support a split;
    /// the caller treats that as a skip, not a failure.
    pub fn tune_cluster(
        &self,
        cluster_id: u32,
        x: &Array2<f64>,
        y: &Array1<u8>,
    ) -> Result<ModelRecord> {
        let rows = x.nrows();
        if rows < self.config.min_cluster_rows {
            return Err(LearningError::ClusterTooSmall {
                cluster_id,
                rows,
                min_rows: self.config.min_cluster_rows,
            });
        }

        let split = train_test_split(x, y, self.config.test_size, self.config.random_state)?;
        let single_class_holdout = distinct_labels(&split.y_test).len() < 2;
        if single_class_holdout {
            debug!(
                cluster_id,
                "held-out rows are single-class, scoring by true-class probability"
            );
        }

        let mut best: Option<Candidate> = None;
        for family in ModelFamily::ALL {
            for candidate in self.grid_for(cluster_id, family, &split)? {
                debug!(
                    cluster_id,
                    family = %family,
                    score = candidate.score,
                    params = %candidate.hyperparameters,
                    "scored candidate"
                );
                let better = best
                    .as_ref()
                    .is_none_or(|current| candidate.score > current.score);
                if better {
                    best = Some(candidate);
                }
            }
        }

        // Both grids are non-empty, so a best candidate always exists.
        let winner = best.ok_or_else(|| LearningError::FitFailed {
            cluster_id,
            reason: "no candidate could be fit".to_string(),
        })?;

        info!(
            cluster_id,
            family = %winner.model.family(),
            score = winner.score,
            rows,
            "selected cluster model"
        );

        Ok(ModelRecord {
            key: ModelKey::new(cluster_id, winner.model.family()),
            model: winner.model,
            validation_score: winner.score,
            hyperparameters: winner.hyperparameters,
            trained_rows: rows,
        })
    }

    fn grid_for(
        &self,
        cluster_id: u32,
        family: ModelFamily,
        split: &crate::data::Split,
    ) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        match family {
            ModelFamily::RandomForest => {
                for &n_estimators in &FOREST_ESTIMATOR_GRID {
                    for &max_depth in &FOREST_DEPTH_GRID {
                        let params = ForestParams {
                            n_estimators,
                            max_depth,
                            min_samples_split: 2,
                            random_state: self.config.random_state,
                        };
                        let model =
                            RandomForestClassifier::fit(&split.x_train, &split.y_train, params)?;
                        let model = TrainedModel::RandomForest(model);
                        let score = self.score(&model, split);
                        candidates.push(Candidate {
                            model,
                            score,
                            hyperparameters: serde_json::json!({
                                "n_estimators": n_estimators,
                                "max_depth": max_depth,
                            }),
                        });
                    }
                }
            }
            ModelFamily::AdaBoost => {
                for &n_estimators in &ADABOOST_ESTIMATOR_GRID {
                    for &learning_rate in &ADABOOST_LEARNING_RATE_GRID {
                        let params = AdaBoostParams {
                            n_estimators,
                            learning_rate,
                            random_state: self.config.random_state,
                        };
                        let fitted =
                            AdaBoostClassifier::fit(&split.x_train, &split.y_train, params);
                        // A degenerate boosting fit on this cluster only
                        // removes the candidate from the grid.
                        let model = match fitted {
                            Ok(m) => TrainedModel::AdaBoost(m),
                            Err(err) if err.is_cluster_local() => {
                                debug!(cluster_id, %err, "boosting candidate dropped");
                                continue;
                            }
                            Err(err) => return Err(err),
                        };
                        let score = self.score(&model, split);
                        candidates.push(Candidate {
                            model,
                            score,
                            hyperparameters: serde_json::json!({
                                "n_estimators": n_estimators,
                                "learning_rate": learning_rate,
                            }),
                        });
                    }
                }
            }
        }
        Ok(candidates)
    }

    fn score(&self, model: &TrainedModel, split: &crate::data::Split) -> f64 {
        if distinct_labels(&split.y_test).len() < 2 {
            let proba = Array1::from_vec(model.predict_proba(&split.x_test));
            mean_true_class_probability(&split.y_test, &proba)
        } else {
            let preds = Array1::from_vec(model.predict(&split.x_test));
            accuracy(&split.y_test, &preds)
        }
    }
}
