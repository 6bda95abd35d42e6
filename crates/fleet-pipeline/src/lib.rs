//! Orchestration for the fleetml predictive-maintenance pipeline.
//!
//! Ties the processing and learning crates together behind two entry
//! points: [`TrainPipeline`] (validate → stage → preprocess → cluster →
//! per-cluster fit → persist) and [`PredictPipeline`] (same front half,
//! then cluster-routed inference against the persisted models). Storage,
//! staging, and run tracking are collaborator seams; the filesystem
//! implementations here stand in for the external systems they model.

pub mod error;
pub mod predict;
pub mod settings;
pub mod staging;
pub mod store;
pub mod tracking;
pub mod train;

// Re-exports for convenient access
pub use error::{PipelineError, Result as PipelineResult};
pub use predict::{PredictPipeline, PredictionOutcome};
pub use settings::PipelineSettings;
pub use staging::{StagingArea, load_raw_batch};
pub use store::{ArtifactStore, LocalStore, Probe};
pub use tracking::{RunTracker, TrainingRunRecord};
pub use train::{TrainPipeline, TrainingOutcome};
