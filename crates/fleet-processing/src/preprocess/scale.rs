//! Batch-local standardization.

use crate::error::Result;
use polars::prelude::*;

/// Standardize every column to zero mean and unit variance.
///
/// The scaler is fit fresh on the current batch, never persisted or reused
/// across runs; this is the same batch-local-fit policy as the
/// zero-variance prune. Uses population variance, matching the usual
/// standard-scaler convention.
pub fn scale(mut df: DataFrame) -> Result<DataFrame> {
    let col_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for name in &col_names {
        let series = df.column(name)?.as_materialized_series();
        let ca = series.f64()?;
        let values: Vec<f64> = ca.into_iter().flatten().collect();
        let n = values.len() as f64;
        if n == 0.0 {
            continue;
        }

        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        // Constant columns are pruned before this stage; keep the guard in
        // case the caller reorders stages.
        let scaled: Vec<f64> = if std == 0.0 {
            values.iter().map(|_| 0.0).collect()
        } else {
            values.iter().map(|v| (v - mean) / std).collect()
        };

        df.replace(name, Series::new(name.as_str().into(), scaled))?;
    }

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_scaled_column_has_zero_mean_unit_variance() {
        let df = df![
            "x" => [2.0, 4.0, 6.0, 8.0],
        ]
        .unwrap();

        let out = scale(df).unwrap();
        let values = column_values(&out, "x");

        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        let var: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_is_idempotent_on_standardized_data() {
        let df = df![
            "x" => [1.0, -1.0, 1.0, -1.0],
        ]
        .unwrap();

        let once = scale(df).unwrap();
        let twice = scale(once.clone()).unwrap();
        assert_eq!(column_values(&once, "x"), column_values(&twice, "x"));
    }

    #[test]
    fn test_scale_preserves_shape() {
        let df = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10.0, 20.0, 15.0],
        ]
        .unwrap();

        let out = scale(df).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(out.width(), 2);
    }
}
