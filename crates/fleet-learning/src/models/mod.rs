//! Trained classifier families and the structured keys they are stored
//! under.
//!
//! A persisted model is identified by its `(cluster_id, family)` key, never
//! by substring matching over file names, so routing at inference is a
//! direct lookup.

mod adaboost;
mod forest;
mod tree;

pub use adaboost::{AdaBoostClassifier, AdaBoostParams};
pub use forest::{ForestParams, RandomForestClassifier};

use crate::error::{LearningError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The classifier families the tuner chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    AdaBoost,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 2] = [ModelFamily::RandomForest, ModelFamily::AdaBoost];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random-forest",
            ModelFamily::AdaBoost => "adaboost",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random-forest" => Ok(ModelFamily::RandomForest),
            "adaboost" => Ok(ModelFamily::AdaBoost),
            other => Err(LearningError::MalformedKey(format!(
                "unknown model family '{other}'"
            ))),
        }
    }
}

/// Structured identity of a persisted model: which cluster it serves and
/// which family it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub cluster_id: u32,
    pub family: ModelFamily,
}

impl ModelKey {
    pub fn new(cluster_id: u32, family: ModelFamily) -> Self {
        Self { cluster_id, family }
    }

    /// Canonical storage key, e.g. `cluster-3-adaboost.json`.
    pub fn storage_key(&self) -> String {
        format!("cluster-{}-{}.json", self.cluster_id, self.family)
    }

    /// Strict inverse of [`storage_key`](Self::storage_key). Anything that
    /// does not match the canonical shape exactly is rejected.
    pub fn parse(key: &str) -> Result<Self> {
        let stem = key
            .strip_suffix(".json")
            .ok_or_else(|| LearningError::MalformedKey(format!("'{key}' lacks .json suffix")))?;
        let rest = stem
            .strip_prefix("cluster-")
            .ok_or_else(|| LearningError::MalformedKey(format!("'{key}' lacks cluster prefix")))?;
        let (id_part, family_part) = rest
            .split_once('-')
            .ok_or_else(|| LearningError::MalformedKey(format!("'{key}' lacks a family")))?;
        let cluster_id: u32 = id_part
            .parse()
            .map_err(|_| LearningError::MalformedKey(format!("'{id_part}' is not a cluster id")))?;
        let family = family_part.parse()?;
        Ok(Self { cluster_id, family })
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster {} / {}", self.cluster_id, self.family)
    }
}

/// A fitted classifier of either family, behind one prediction surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TrainedModel {
    RandomForest(RandomForestClassifier),
    AdaBoost(AdaBoostClassifier),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
            TrainedModel::AdaBoost(_) => ModelFamily::AdaBoost,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<u8> {
        match self {
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::AdaBoost(m) => m.predict(x),
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        match self {
            TrainedModel::RandomForest(m) => m.predict_proba(x),
            TrainedModel::AdaBoost(m) => m.predict_proba(x),
        }
    }
}

/// The persisted unit for one cluster: the winning model plus the metadata
/// a later reader needs to audit how it was chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub key: ModelKey,
    pub model: TrainedModel,
    pub validation_score: f64,
    pub hyperparameters: serde_json::Value,
    pub trained_rows: usize,
}

impl ModelRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
