//! Run-level error taxonomy for the train and predict orchestrators.
//!
//! Everything that can go wrong in a run collapses into five kinds. Two of
//! them are handled in place and never abort a run: schema violations route
//! the offending file aside, model-fit failures skip the offending cluster.
//! The other three are fatal and surface one human-readable message.

use thiserror::Error;

/// The main error type for pipeline runs.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A specific file failed filename/column/nullness checks. Per-file and
    /// non-fatal: the file is excluded and the batch continues.
    #[error("Schema violation in '{file}': {reason}")]
    SchemaViolation { file: String, reason: String },

    /// A transform stage could not execute on the given table. Fatal.
    #[error("Preprocessing failure in {stage}: {reason}")]
    PreprocessingFailure { stage: String, reason: String },

    /// An inference cluster id has no matching persisted model. Fatal, and
    /// no output artifact is written.
    #[error("No persisted model matches cluster {cluster_id}")]
    ClusterRoutingFailure { cluster_id: u32 },

    /// Model selection failed for one cluster. Per-cluster and non-fatal:
    /// the cluster is skipped and reported, the run continues.
    #[error("Model fit failed for cluster {cluster_id}: {reason}")]
    ModelFitFailure { cluster_id: u32, reason: String },

    /// An artifact read/write at the collaborator boundary failed. Fatal.
    #[error("Storage failure during {op} of '{key}': {reason}")]
    StorageFailure {
        op: &'static str,
        key: String,
        reason: String,
    },
}

impl PipelineError {
    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            Self::PreprocessingFailure { .. } => "PREPROCESSING_FAILURE",
            Self::ClusterRoutingFailure { .. } => "CLUSTER_ROUTING_FAILURE",
            Self::ModelFitFailure { .. } => "MODEL_FIT_FAILURE",
            Self::StorageFailure { .. } => "STORAGE_FAILURE",
        }
    }

    /// True for conditions that abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PreprocessingFailure { .. }
                | Self::ClusterRoutingFailure { .. }
                | Self::StorageFailure { .. }
        )
    }

    pub(crate) fn preprocessing(
        stage: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::PreprocessingFailure {
            stage: stage.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn storage(
        op: &'static str,
        key: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::StorageFailure {
            op,
            key: key.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PipelineError::ClusterRoutingFailure { cluster_id: 4 };
        assert_eq!(err.error_code(), "CLUSTER_ROUTING_FAILURE");
        assert!(err.to_string().contains("cluster 4"));
    }

    #[test]
    fn test_fatality_split() {
        assert!(PipelineError::storage("load", "models/x.json", "gone").is_fatal());
        assert!(PipelineError::ClusterRoutingFailure { cluster_id: 0 }.is_fatal());
        assert!(
            !PipelineError::ModelFitFailure {
                cluster_id: 0,
                reason: "too few rows".into()
            }
            .is_fatal()
        );
        assert!(
            !PipelineError::SchemaViolation {
                file: "f.csv".into(),
                reason: "bad name".into()
            }
            .is_fatal()
        );
    }
}
