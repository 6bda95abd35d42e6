//! AdaBoost (SAMME) over shallow weighted trees.

use super::tree::{DecisionTree, TreeParams};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

const STUMP_DEPTH: usize = 1;
const WEIGHT_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdaBoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub random_state: u64,
}

impl Default for AdaBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    params: AdaBoostParams,
    stages: Vec<(DecisionTree, f64)>,
}

impl AdaBoostClassifier {
    pub fn fit(x: &Array2<f64>, y: &Array1<u8>, params: AdaBoostParams) -> Result<Self> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(LearningError::ShapeMismatch(format!(
                "boosting fit on {n} rows against {} labels",
                y.len()
            )));
        }
        if params.n_estimators == 0 || params.learning_rate <= 0.0 {
            return Err(LearningError::InvalidConfig(
                "boosting needs estimators and a positive learning rate".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.random_state);
        let mut weights = Array1::from_elem(n, 1.0 / n as f64);
        let indices: Vec<usize> = (0..n).collect();
        let tree_params = TreeParams {
            max_depth: STUMP_DEPTH,
            min_samples_split: 2,
            max_features: None,
        };

        let mut stages = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let tree = DecisionTree::fit(x, y, &weights, &indices, tree_params, &mut rng);

            let mut err = 0.0;
            let mut predictions = Vec::with_capacity(n);
            for i in 0..n {
                let row: Vec<f64> = x.row(i).to_vec();
                let pred = tree.predict_row(&row);
                if pred != y[i] {
                    err += weights[i];
                }
                predictions.push(pred);
            }

            // A perfect learner dominates; a useless one ends the run.
            if err <= WEIGHT_FLOOR {
                stages.push((tree, 1.0));
                break;
            }
            if err >= 0.5 {
                break;
            }

            let alpha = params.learning_rate * ((1.0 - err) / err).ln();
            for i in 0..n {
                if predictions[i] != y[i] {
                    weights[i] *= alpha.exp();
                }
            }
            let total: f64 = weights.sum();
            weights.mapv_inplace(|w| (w / total).max(WEIGHT_FLOOR));

            stages.push((tree, alpha));
        }

        if stages.is_empty() {
            // The model layer does not know its cluster; the tuner drops
            // this candidate from the grid.
            return Err(LearningError::FitFailed {
                cluster_id: u32::MAX,
                reason: "no boosting stage beat random guessing".to_string(),
            });
        }

        Ok(Self { params, stages })
    }

    /// Positive-class score: alpha-weighted vote share for class 1.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        let alpha_sum: f64 = self.stages.iter().map(|(_, a)| a).sum();
        x.rows()
            .into_iter()
            .map(|row| {
                let row: Vec<f64> = row.to_vec();
                let pos: f64 = self
                    .stages
                    .iter()
                    .filter(|(t, _)| t.predict_row(&row) == 1)
                    .map(|(_, a)| a)
                    .sum();
                pos / alpha_sum
            })
            .collect()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<u8> {
        self.predict_proba(x)
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect()
    }

    pub fn params(&self) -> &AdaBoostParams {
        &self.params
    }
}
