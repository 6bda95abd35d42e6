//! Zero-variance column pruning.

use crate::error::{ProcessingError, Result};
use crate::utils::series_std;
use polars::prelude::*;
use tracing::debug;

/// Drop every column whose standard deviation is zero. A constant column
/// contributes nothing to classification.
///
/// The dropped set is recomputed from each batch: it is a per-batch
/// diagnostic, not a persisted artifact, so train and predict batches may
/// legitimately prune different columns.
pub fn drop_zero_variance_columns(mut df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
    let col_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut dropped = Vec::new();
    for name in &col_names {
        let series = df.column(name)?.as_materialized_series();
        if series_std(series) == Some(0.0) {
            debug!(column = %name, "dropping zero-variance column");
            df = df.drop(name)?;
            dropped.push(name.clone());
        }
    }

    if df.width() == 0 {
        return Err(ProcessingError::NoFeaturesRemain {
            stage: "drop_zero_variance_columns",
        });
    }

    Ok((df, dropped))
}
