//! Missing-value detection and mean imputation.

use crate::error::{ProcessingError, Result};
use crate::types::NullReport;
use crate::utils::fill_numeric_nulls;
use polars::prelude::*;
use tracing::{debug, warn};

/// Compute per-column null counts. The report is the side artifact the
/// pipeline persists when any column is affected; when it is empty the
/// imputation stage is skipped entirely.
pub fn detect_missing(df: &DataFrame) -> NullReport {
    let mut columns = Vec::new();

    for column in df.get_columns() {
        let nulls = column.null_count();
        if nulls > 0 {
            columns.push((column.name().to_string(), nulls));
        }
    }

    NullReport { columns }
}

/// Impute missing values per column:
///
/// 1. drop any column whose missing fraction is strictly above `threshold`;
/// 2. coerce survivors to Float64;
/// 3. fill remaining nulls with the column mean over the current batch.
///
/// When a column's mean is undefined (all values null after coercion) the
/// fill value is 0.0. Returns the imputed frame plus the names of dropped
/// columns.
pub fn impute(mut df: DataFrame, threshold: f64) -> Result<(DataFrame, Vec<String>)> {
    let height = df.height();
    let mut dropped = Vec::new();

    let col_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for name in &col_names {
        let nulls = df.column(name)?.null_count();
        let fraction = if height == 0 {
            0.0
        } else {
            nulls as f64 / height as f64
        };

        if fraction > threshold {
            debug!(column = %name, fraction, "dropping column over missing threshold");
            df = df.drop(name)?;
            dropped.push(name.clone());
        }
    }

    if df.width() == 0 {
        return Err(ProcessingError::NoFeaturesRemain { stage: "impute" });
    }

    let survivors: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for name in &survivors {
        let series = df.column(name)?.as_materialized_series().clone();
        let numeric = series.cast(&DataType::Float64).map_err(|e| {
            ProcessingError::Polars(e)
                .with_context(format!("coercing column '{name}' to numeric"))
        })?;

        if numeric.null_count() == 0 {
            df.replace(name, numeric)?;
            continue;
        }

        // Mean over the current batch; 0.0 when no value survived coercion.
        let fill = match numeric.mean() {
            Some(mean) => mean,
            None => {
                warn!(column = %name, "column mean undefined, filling with 0.0");
                0.0
            }
        };

        let filled = fill_numeric_nulls(&numeric, fill)?;
        df.replace(name, filled)?;
    }

    Ok((df, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_missing_reports_affected_columns_only() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let report = detect_missing(&df);
        assert_eq!(report.columns, vec![("a".to_string(), 1)]);
        assert!(report.any_missing());
    }

    #[test]
    fn test_detect_missing_clean_table() {
        let df = df!["a" => [1.0, 2.0]].unwrap();
        assert!(!detect_missing(&df).any_missing());
    }

    #[test]
    fn test_impute_drops_column_over_threshold() {
        // 3/4 missing = 0.75 > 0.6
        let df = df![
            "mostly_gone" => [Some("1"), None, None, None],
            "kept" => [Some("1"), Some("2"), None, Some("4")],
        ]
        .unwrap();

        let (out, dropped) = impute(df, 0.6).unwrap();
        assert_eq!(dropped, vec!["mostly_gone".to_string()]);
        assert!(out.column("mostly_gone").is_err());
        assert!(out.column("kept").is_ok());
    }

    #[test]
    fn test_impute_keeps_column_at_threshold_boundary() {
        // exactly 0.6 missing is kept (threshold is strict)
        let df = df![
            "edge" => [Some("1"), Some("2"), None, None, None],
        ]
        .unwrap();

        let (out, dropped) = impute(df, 0.6).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(out.column("edge").unwrap().null_count(), 0);
    }

    #[test]
    fn test_impute_fills_with_batch_mean() {
        let df = df![
            "x" => [Some("2"), None, Some("4")],
        ]
        .unwrap();

        let (out, _) = impute(df, 0.6).unwrap();
        let x = out.column("x").unwrap();
        // Mean of [2, 4] = 3
        assert_eq!(x.get(1).unwrap().try_extract::<f64>().unwrap(), 3.0);
        assert_eq!(x.null_count(), 0);
    }

    #[test]
    fn test_impute_row_count_preserved() {
        let df = df![
            "x" => [Some("1"), None, Some("3"), None],
        ]
        .unwrap();

        let (out, _) = impute(df, 0.6).unwrap();
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn test_impute_all_columns_dropped_is_error() {
        let df = df![
            "gone" => [None::<&str>, None, None, Some("1")],
        ]
        .unwrap();

        let result = impute(df, 0.6);
        assert!(matches!(
            result.unwrap_err(),
            ProcessingError::NoFeaturesRemain { stage: "impute" }
        ));
    }

    #[test]
    fn test_impute_output_is_numeric() {
        let df = df![
            "x" => [Some("1"), Some("2"), None],
        ]
        .unwrap();

        let (out, _) = impute(df, 0.6).unwrap();
        assert!(matches!(
            out.column("x").unwrap().dtype(),
            DataType::Float64
        ));
    }
}
