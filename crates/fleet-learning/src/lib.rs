//! Clustering and per-cluster classifier training for vehicle sensor data.
//!
//! This crate is the learning half of the fleetml pipeline. A preprocessed
//! feature table is first segmented with a seeded KMeans partitioner (the
//! cluster count chosen by the knee of the WCSS curve), then each segment
//! gets its own binary classifier: a bounded grid search over random-forest
//! and AdaBoost candidates, scored on a held-out split, with the single
//! best model kept per cluster.
//!
//! The fitted partitioner and the per-cluster [`ModelRecord`]s are the only
//! artifacts that cross the train/predict boundary; at inference the
//! partitioner routes rows by assignment alone and the records are looked
//! up by their structured [`ModelKey`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fleet_learning::{ClusterTuner, TrainingConfig, cluster};
//!
//! let config = TrainingConfig::default();
//! let outcome = cluster::fit_with_elbow(&features, config.max_clusters, config.random_state)?;
//!
//! let tuner = ClusterTuner::new(config);
//! for cluster_id in 0..outcome.partitioner.k() as u32 {
//!     let record = tuner.tune_cluster(cluster_id, &cluster_x, &cluster_y)?;
//!     println!("{}: {:.3}", record.key, record.validation_score);
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod tuner;

// Re-exports for convenient access
pub use cluster::{ClusteringOutcome, KMeansPartitioner, fit_with_elbow};
pub use config::{ConfigValidationError, TrainingConfig, TrainingConfigBuilder};
pub use data::{Split, columns_to_array, distinct_labels, frame_to_array, train_test_split};
pub use error::{LearningError, Result as LearningResult};
pub use metrics::{accuracy, mean_true_class_probability};
pub use models::{
    AdaBoostClassifier, AdaBoostParams, ForestParams, ModelFamily, ModelKey, ModelRecord,
    RandomForestClassifier, TrainedModel,
};
pub use tuner::ClusterTuner;
