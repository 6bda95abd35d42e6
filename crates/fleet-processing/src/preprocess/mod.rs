//! The preprocessing pipeline: the same ordered stages at train and
//! predict time.
//!
//! Stage order is fixed: sentinel replacement, missing-value detection,
//! imputation, zero-variance pruning, standardization, dimensionality
//! reduction. No stage changes the row count, so positional row identity is
//! preserved end-to-end and results can be re-joined with labels or cluster
//! assignments after any column-dropping step.

mod missing;
mod reduce;
mod sanitize;
mod scale;
mod variance;

pub use missing::{detect_missing, impute};
pub use reduce::{frame_to_array, reduce_dimensions};
pub use sanitize::replace_invalid_markers;
pub use scale::scale;
pub use variance::drop_zero_variance_columns;

use crate::config::PreprocessConfig;
use crate::error::{ProcessingError, Result};
use crate::types::PreprocessReport;
use polars::prelude::*;
use tracing::{debug, info};

/// Output of a full preprocessing run.
#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    /// Fully numeric feature table (scaled and reduced), same row count as
    /// the input.
    pub features: DataFrame,
    /// Label column separated from the input, present when a label name was
    /// given. Sanitized but otherwise untouched.
    pub label: Option<Series>,
    /// What each stage did.
    pub report: PreprocessReport,
}

/// Stateless (per-call) preprocessing pipeline.
///
/// Scaler, zero-variance set, and projection are all fit fresh on each batch
/// by design; none of them is a persisted artifact, so train and predict
/// batches are transformed by the same code under the same policy.
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Run every stage on the given table.
    ///
    /// When `label_column` is set, sentinel replacement and missing-value
    /// detection run on the *full* table first, and the label is separated
    /// before the numeric stages. Any stage failure aborts the run; nothing
    /// partial is returned.
    pub fn run(&self, df: DataFrame, label_column: Option<&str>) -> Result<PreprocessOutcome> {
        let input_rows = df.height();
        let mut report = PreprocessReport::default();

        info!(
            rows = input_rows,
            cols = df.width(),
            "preprocessing started"
        );

        // Stage 1: sentinel markers become nulls.
        let df = self.staged("replace_invalid_markers", &df, |df| {
            replace_invalid_markers(df, &self.config.invalid_markers)
        })?;
        report
            .steps
            .push("Replaced invalid markers with nulls".to_string());

        // Stage 2: null diagnostics over the full table, before any label
        // separation.
        report.null_report = detect_missing(&df);
        if report.null_report.any_missing() {
            debug!(
                affected = report.null_report.columns.len(),
                "missing values detected"
            );
            report.steps.push(format!(
                "Detected missing values in {} columns",
                report.null_report.columns.len()
            ));
        } else {
            report
                .steps
                .push("No missing values detected".to_string());
        }

        // Separate label before numeric coercion.
        let (mut df, label) = match label_column {
            Some(name) => {
                let label = df
                    .column(name)
                    .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?
                    .as_materialized_series()
                    .clone();
                (df.drop(name)?, Some(label))
            }
            None => (df, None),
        };

        // Stage 3: imputation, skipped when the table is already clean.
        if report.null_report.any_missing() {
            let (imputed, dropped) = self.staged("impute", &df, |df| {
                impute(df, self.config.missing_column_threshold)
            })?;
            df = imputed;
            report.steps.push(format!(
                "Imputed missing values; dropped {} columns over threshold",
                dropped.len()
            ));
            report.dropped_missing_columns = dropped;
        } else {
            // Coercion to numeric still applies on a clean table.
            let (coerced, _) = self.staged("impute", &df, |df| impute(df, 1.0))?;
            df = coerced;
            report
                .steps
                .push("No imputation needed; coerced columns to numeric".to_string());
        }

        // Stage 4: per-batch zero-variance prune.
        let (df, dropped) =
            self.staged("drop_zero_variance_columns", &df, drop_zero_variance_columns)?;
        report.steps.push(format!(
            "Dropped {} zero-variance columns",
            dropped.len()
        ));
        report.dropped_zero_variance_columns = dropped;

        // Stage 5: batch-local standardization.
        let df = self.staged("scale", &df, scale)?;
        report.steps.push("Standardized feature columns".to_string());

        // Stage 6: batch-local projection.
        let df = self.staged("reduce_dimensions", &df, |df| {
            reduce_dimensions(&df, self.config.pca_components, self.config.random_state)
        })?;
        report.steps.push(format!(
            "Reduced to {} principal components",
            df.width()
        ));

        if df.height() != input_rows {
            return Err(ProcessingError::RowAlignmentBroken {
                stage: "pipeline",
                before: input_rows,
                after: df.height(),
            });
        }

        info!(
            rows = df.height(),
            cols = df.width(),
            "preprocessing complete"
        );

        Ok(PreprocessOutcome {
            features: df,
            label,
            report,
        })
    }

    /// Run one stage, attaching the stage name and input shape to any
    /// failure, and enforcing the row-alignment contract.
    fn staged<T, F>(&self, stage: &'static str, input: &DataFrame, f: F) -> Result<T>
    where
        F: FnOnce(DataFrame) -> Result<T>,
        T: RowCounted,
    {
        let (rows, cols) = (input.height(), input.width());
        debug!(stage, rows, cols, "running stage");

        let out = f(input.clone()).map_err(|e| match e {
            e @ ProcessingError::StageFailed { .. } => e,
            e @ ProcessingError::NoFeaturesRemain { .. } => e,
            other => ProcessingError::StageFailed {
                stage,
                rows,
                cols,
                reason: other.to_string(),
            },
        })?;

        if let Some(after) = out.row_count()
            && after != rows
        {
            return Err(ProcessingError::RowAlignmentBroken {
                stage,
                before: rows,
                after,
            });
        }

        Ok(out)
    }
}

/// Stage outputs that carry a row count, so the orchestrator can enforce
/// that columns may shrink but rows never do.
trait RowCounted {
    fn row_count(&self) -> Option<usize>;
}

impl RowCounted for DataFrame {
    fn row_count(&self) -> Option<usize> {
        Some(self.height())
    }
}

impl RowCounted for (DataFrame, Vec<String>) {
    fn row_count(&self) -> Option<usize> {
        Some(self.0.height())
    }
}
