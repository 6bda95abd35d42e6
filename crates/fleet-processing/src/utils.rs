//! Shared helpers for validation and preprocessing.

use polars::prelude::*;

// =============================================================================
// Missing-Value Utilities
// =============================================================================

/// Count missing cells in a series: genuine nulls plus literal sentinel
/// strings that stand in for missing data.
pub fn missing_count(series: &Series, markers: &[String]) -> usize {
    let mut count = series.null_count();

    if let Ok(str_chunked) = series.str() {
        for val in str_chunked.into_iter().flatten() {
            let trimmed = val.trim();
            if markers.iter().any(|m| m == trimmed) {
                count += 1;
            }
        }
    }

    count
}

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let mask = series.is_null();
    let len = series.len();
    let mut result_vec = Vec::with_capacity(len);

    for i in 0..len {
        if mask.get(i).unwrap_or(false) {
            result_vec.push(Some(fill_value));
        } else {
            let val = series.get(i)?;
            result_vec.push(Some(val.try_extract::<f64>()?));
        }
    }

    Ok(Series::new(series.name().clone(), result_vec))
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Sample standard deviation (ddof = 1) of a Float64 series, computed over
/// non-null values. `None` when fewer than two values are present.
pub fn series_std(series: &Series) -> Option<f64> {
    let ca = series.f64().ok()?;
    let values: Vec<f64> = ca.into_iter().flatten().collect();
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}
