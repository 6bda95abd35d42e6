//! Matrix extraction and seeded splitting.

use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Extract named columns from a DataFrame into a row-major matrix.
///
/// Column-major Polars data is gathered first, then laid out row-major via
/// `from_shape_fn` for cache-friendly construction.
pub fn columns_to_array(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            let series = df
                .column(name)
                .map_err(|_| LearningError::ShapeMismatch(format!("column '{name}' not found")))?;
            let series_f64 = series
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            Ok(series_f64
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract every column of a numeric DataFrame into a row-major matrix.
pub fn frame_to_array(df: &DataFrame) -> Result<Array2<f64>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    columns_to_array(df, &names)
}

/// A seeded train/test split of a feature matrix and label vector.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub y_train: Array1<u8>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<u8>,
}

/// Shuffle row indices with a fixed seed and split off `test_size` of them
/// for scoring. The same seed always produces the same split.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<u8>,
    test_size: f64,
    seed: u64,
) -> Result<Split> {
    let n = x.nrows();
    if n != y.len() {
        return Err(LearningError::ShapeMismatch(format!(
            "{} feature rows but {} labels",
            n,
            y.len()
        )));
    }
    if n < 2 {
        return Err(LearningError::ShapeMismatch(
            "at least two rows are required to split".to_string(),
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    // Both sides stay non-empty for any valid test_size.
    let n_test = ((n as f64 * test_size).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        x_train: x.select(Axis(0), train_idx),
        y_train: select_labels(y, train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_test: select_labels(y, test_idx),
    })
}

fn select_labels(y: &Array1<u8>, indices: &[usize]) -> Array1<u8> {
    Array1::from_iter(indices.iter().map(|&i| y[i]))
}

/// Distinct labels present in a vector, sorted.
pub fn distinct_labels(y: &Array1<u8>) -> Vec<u8> {
    let mut labels: Vec<u8> = y.iter().copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}
