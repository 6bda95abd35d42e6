//! Error types for clustering and model training.

use thiserror::Error;

/// The main error type for learning operations.
#[derive(Error, Debug)]
pub enum LearningError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The feature matrix has the wrong shape for the operation.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A cluster has too few rows for a meaningful train/test split.
    ///
    /// Non-fatal at the run level: the trainer skips the cluster and
    /// continues.
    #[error("Cluster {cluster_id} has {rows} rows, fewer than the minimum of {min_rows}")]
    ClusterTooSmall {
        cluster_id: u32,
        rows: usize,
        min_rows: usize,
    },

    /// A candidate classifier could not be fit.
    #[error("Model fit failed for cluster {cluster_id}: {reason}")]
    FitFailed { cluster_id: u32, reason: String },

    /// A persisted model key could not be parsed.
    #[error("Malformed model key: {0}")]
    MalformedKey(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ShapeMismatch(_) => "SHAPE_MISMATCH",
            Self::ClusterTooSmall { .. } => "CLUSTER_TOO_SMALL",
            Self::FitFailed { .. } => "FIT_FAILED",
            Self::MalformedKey(_) => "MALFORMED_KEY",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// True for per-cluster conditions the trainer reports and skips rather
    /// than aborting the run.
    pub fn is_cluster_local(&self) -> bool {
        matches!(
            self,
            Self::ClusterTooSmall { .. } | Self::FitFailed { .. }
        )
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
