//! Error types for schema validation and batch preprocessing.
//!
//! A single `thiserror` hierarchy covers both halves of the crate. Schema
//! findings for an individual file are deliberately *not* errors: a bad file
//! is routed to the invalid area and the batch continues, so those outcomes
//! live in [`crate::types::FileVerdict`] instead. Only structural problems
//! (unreadable schema descriptor, a transform stage that cannot execute)
//! surface through this type.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for validation and preprocessing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The schema descriptor itself could not be read or parsed.
    ///
    /// This is the one fatal condition during validation; per-file failures
    /// are verdicts, not errors.
    #[error("Failed to read schema descriptor from '{path}': {reason}")]
    SchemaUnreadable { path: String, reason: String },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A preprocessing stage could not execute on the given table shape.
    #[error("Preprocessing stage '{stage}' failed on table of shape {rows}x{cols}: {reason}")]
    StageFailed {
        stage: &'static str,
        rows: usize,
        cols: usize,
        reason: String,
    },

    /// No feature columns survived preprocessing.
    #[error("No numeric feature columns remain after '{stage}'")]
    NoFeaturesRemain { stage: &'static str },

    /// A preprocessing stage changed the row count, which violates the
    /// row-alignment contract.
    #[error("Stage '{stage}' changed row count from {before} to {after}")]
    RowAlignmentBroken {
        stage: &'static str,
        before: usize,
        after: usize,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaUnreadable { .. } => "SCHEMA_UNREADABLE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::StageFailed { .. } => "STAGE_FAILED",
            Self::NoFeaturesRemain { .. } => "NO_FEATURES_REMAIN",
            Self::RowAlignmentBroken { .. } => "ROW_ALIGNMENT_BROKEN",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

/// Serialize as a `{code, message}` struct for callers that ship errors
/// across a process boundary.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::ColumnNotFound("aa_000".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ProcessingError::NoFeaturesRemain { stage: "impute" }.error_code(),
            "NO_FEATURES_REMAIN"
        );
    }

    #[test]
    fn test_with_context_preserves_code() {
        let err = ProcessingError::ColumnNotFound("class".to_string())
            .with_context("During label separation");
        assert!(err.to_string().contains("During label separation"));
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_error_serialization() {
        let err = ProcessingError::StageFailed {
            stage: "scale",
            rows: 10,
            cols: 3,
            reason: "no numeric columns".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("STAGE_FAILED"));
        assert!(json.contains("10x3"));
    }
}
