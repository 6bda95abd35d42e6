//! Linear dimensionality reduction (PCA), fit fresh per batch.

use crate::error::{ProcessingError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POWER_ITERATIONS: usize = 300;
const CONVERGENCE_TOL: f64 = 1e-10;

/// Project the scaled feature table onto its leading principal components.
///
/// Components are extracted from the batch covariance matrix by power
/// iteration with deflation, seeded so repeated runs on the same batch
/// produce identical output. The component count is clamped to the number of
/// available feature columns. Like the scaler, the projection is fit fresh
/// per batch and never persisted.
pub fn reduce_dimensions(df: &DataFrame, n_components: usize, seed: u64) -> Result<DataFrame> {
    let n_rows = df.height();
    let n_cols = df.width();

    if n_rows < 2 {
        return Err(ProcessingError::StageFailed {
            stage: "reduce_dimensions",
            rows: n_rows,
            cols: n_cols,
            reason: "at least two rows are required to fit a projection".to_string(),
        });
    }

    let k = n_components.min(n_cols);
    let x = frame_to_array(df)?;

    // Center columns; the scale stage normally does this already, but the
    // projection must not depend on stage ordering.
    let mut centered = x;
    for mut col in centered.columns_mut() {
        let mean = col.sum() / n_rows as f64;
        col.mapv_inplace(|v| v - mean);
    }

    let mut cov = centered.t().dot(&centered) / (n_rows as f64 - 1.0);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut components = Array2::<f64>::zeros((n_cols, k));
    for comp in 0..k {
        let v = dominant_eigenvector(&cov, &mut rng);
        let lambda = v.dot(&cov.dot(&v));

        // Deflate so the next iteration finds the next component.
        for i in 0..n_cols {
            for j in 0..n_cols {
                cov[[i, j]] -= lambda * v[i] * v[j];
            }
        }

        components.column_mut(comp).assign(&v);
    }

    let projected = centered.dot(&components);

    let mut columns = Vec::with_capacity(k);
    for comp in 0..k {
        let values: Vec<f64> = projected.column(comp).to_vec();
        columns.push(Column::new(format!("pc_{comp}").into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Extract a numeric frame into a row-major matrix.
pub fn frame_to_array(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = df.width();

    let col_data: Vec<Vec<f64>> = df
        .get_columns()
        .iter()
        .map(|column| {
            let series = column.as_materialized_series();
            let ca = series
                .cast(&DataType::Float64)
                .map_err(ProcessingError::Polars)?;
            Ok(ca
                .f64()
                .map_err(ProcessingError::Polars)?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect())
        })
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_data[c][r]
    }))
}

fn dominant_eigenvector(matrix: &Array2<f64>, rng: &mut StdRng) -> Array1<f64> {
    let d = matrix.nrows();
    let mut v = Array1::from_shape_fn(d, |_| rng.gen_range(-1.0_f64..1.0));
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v /= norm;
    }

    for _ in 0..POWER_ITERATIONS {
        let next = matrix.dot(&v);
        let norm = next.dot(&next).sqrt();
        if norm < CONVERGENCE_TOL {
            // Deflated matrix is (numerically) zero; any unit vector works.
            break;
        }
        let next = next / norm;
        let delta = (&next - &v).mapv(f64::abs).sum();
        v = next;
        if delta < CONVERGENCE_TOL {
            break;
        }
    }

    v
}
