//! Random forest over bootstrap samples of the cluster's rows.

use super::tree::{DecisionTree, TreeParams};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    /// Fit `n_estimators` trees in parallel, each on a bootstrap sample
    /// with sqrt-feature subsampling at every split.
    pub fn fit(x: &Array2<f64>, y: &Array1<u8>, params: ForestParams) -> Result<Self> {
        let n = x.nrows();
        if n == 0 || n != y.len() {
            return Err(LearningError::ShapeMismatch(format!(
                "forest fit on {n} rows against {} labels",
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "forest needs at least one tree".to_string(),
            ));
        }

        let weights = Array1::from_elem(n, 1.0);
        let max_features = Some((x.ncols() as f64).sqrt().ceil() as usize);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features,
        };

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                // Per-tree seed derived from the base seed keeps the fit
                // deterministic regardless of thread scheduling.
                let mut rng = StdRng::seed_from_u64(
                    params.random_state.wrapping_add(t as u64),
                );
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, y, &weights, &indices, tree_params, &mut rng)
            })
            .collect();

        Ok(Self { params, trees })
    }

    /// Positive-class probability per row: the mean of the leaf
    /// probabilities across trees.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let row: Vec<f64> = row.to_vec();
                let sum: f64 = self
                    .trees
                    .iter()
                    .map(|t| t.predict_proba_row(&row))
                    .sum();
                sum / self.trees.len() as f64
            })
            .collect()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<u8> {
        self.predict_proba(x)
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}
