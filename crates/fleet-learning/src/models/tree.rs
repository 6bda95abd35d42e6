//! Weighted CART decision tree for binary classification.
//!
//! Serves as the base learner for both ensemble families: the forest grows
//! deep trees over bootstrap samples with feature subsampling, boosting
//! grows shallow trees over reweighted samples.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum TreeNode {
    Leaf {
        /// Weighted probability of the positive class at this leaf.
        proba_pos: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Number of features examined per split; `None` means all of them.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    /// Fit a tree on the rows of `x` indexed by `indices`, weighted by
    /// `weights`. Labels are 0/1.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<u8>,
        weights: &Array1<f64>,
        indices: &[usize],
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let root = grow(x, y, weights, indices, params, 0, rng);
        Self { root }
    }

    /// Probability of the positive class for one row.
    pub fn predict_proba_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { proba_pos } => return *proba_pos,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba_row(row) >= 0.5)
    }
}

fn grow(
    x: &Array2<f64>,
    y: &Array1<u8>,
    weights: &Array1<f64>,
    indices: &[usize],
    params: TreeParams,
    depth: usize,
    rng: &mut StdRng,
) -> TreeNode {
    let (total_weight, pos_weight) = weighted_counts(y, weights, indices);
    let proba_pos = if total_weight > 0.0 {
        pos_weight / total_weight
    } else {
        0.5
    };

    let pure = proba_pos == 0.0 || proba_pos == 1.0;
    if pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
        return TreeNode::Leaf { proba_pos };
    }

    let Some((feature, threshold)) = best_split(x, y, weights, indices, params, rng) else {
        return TreeNode::Leaf { proba_pos };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[[i, feature]] <= threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return TreeNode::Leaf { proba_pos };
    }

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(grow(x, y, weights, &left_idx, params, depth + 1, rng)),
        right: Box::new(grow(x, y, weights, &right_idx, params, depth + 1, rng)),
    }
}

fn weighted_counts(y: &Array1<u8>, weights: &Array1<f64>, indices: &[usize]) -> (f64, f64) {
    let mut total = 0.0;
    let mut pos = 0.0;
    for &i in indices {
        total += weights[i];
        if y[i] == 1 {
            pos += weights[i];
        }
    }
    (total, pos)
}

fn gini(total: f64, pos: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

/// Best (feature, threshold) by weighted gini impurity reduction, scanning
/// sorted unique values per candidate feature.
fn best_split(
    x: &Array2<f64>,
    y: &Array1<u8>,
    weights: &Array1<f64>,
    indices: &[usize],
    params: TreeParams,
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let n_features = x.ncols();
    let mut features: Vec<usize> = (0..n_features).collect();
    if let Some(m) = params.max_features {
        features.shuffle(rng);
        features.truncate(m.max(1).min(n_features));
    }

    let (parent_total, parent_pos) = weighted_counts(y, weights, indices);
    let parent_gini = gini(parent_total, parent_pos);

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = 1e-12;

    for &feature in &features {
        let mut ordered: Vec<usize> = indices.to_vec();
        ordered.sort_by(|&a, &b| {
            x[[a, feature]]
                .partial_cmp(&x[[b, feature]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_total = 0.0;
        let mut left_pos = 0.0;
        for w in 0..ordered.len() - 1 {
            let i = ordered[w];
            left_total += weights[i];
            if y[i] == 1 {
                left_pos += weights[i];
            }

            let here = x[[i, feature]];
            let next = x[[ordered[w + 1], feature]];
            if here == next {
                continue;
            }

            let right_total = parent_total - left_total;
            let right_pos = parent_pos - left_pos;
            let weighted_child = (left_total * gini(left_total, left_pos)
                + right_total * gini(right_total, right_pos))
                / parent_total;
            let gain = parent_gini - weighted_child;
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, (here + next) / 2.0));
            }
        }
    }

    best
}
