//! KMeans partitioning of the preprocessed feature space.
//!
//! The cluster count is chosen by scanning a range of candidates and taking
//! the knee of the within-cluster sum-of-squares curve. The fitted
//! partitioner is the routing artifact: it is persisted after training and
//! only ever *assigns* cluster ids at inference, never refits, so the
//! id-to-region mapping is identical on both paths.

use crate::error::{LearningError, Result};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MAX_LLOYD_ITERATIONS: usize = 300;
const CONVERGENCE_TOL: f64 = 1e-8;

/// A fitted KMeans partitioner: `k` centroids over the reduced feature
/// space. Cluster ids are dense integers `0..k-1` and every cluster is
/// non-empty on the data it was fit on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansPartitioner {
    centroids: Array2<f64>,
    random_state: u64,
}

impl KMeansPartitioner {
    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Dimensionality of the space the partitioner was fit in.
    pub fn dims(&self) -> usize {
        self.centroids.ncols()
    }

    /// Fit a partitioner with exactly `k` clusters (k-means++ init, Lloyd
    /// iterations, seeded).
    pub fn fit(x: &Array2<f64>, k: usize, seed: u64) -> Result<Self> {
        let n = x.nrows();
        if k == 0 {
            return Err(LearningError::InvalidConfig(
                "cluster count must be at least 1".to_string(),
            ));
        }
        if n < k {
            return Err(LearningError::ShapeMismatch(format!(
                "{n} rows cannot form {k} clusters"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = plus_plus_init(x, k, &mut rng);
        let mut assignments = vec![0usize; n];

        for iteration in 0..MAX_LLOYD_ITERATIONS {
            // Assignment step.
            for (i, row) in x.rows().into_iter().enumerate() {
                assignments[i] = nearest_centroid(&row, &centroids);
            }

            // Update step.
            let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
            let mut counts = vec![0usize; k];
            for (i, row) in x.rows().into_iter().enumerate() {
                let c = assignments[i];
                counts[c] += 1;
                let mut sum_row = sums.row_mut(c);
                sum_row += &row;
            }

            let mut shift = 0.0;
            for c in 0..k {
                if counts[c] == 0 {
                    // Reseed an empty cluster with the point farthest from
                    // its centroid, keeping ids dense and non-empty.
                    let far = farthest_point(x, &centroids, &assignments);
                    assignments[far] = c;
                    let row = x.row(far).to_owned();
                    shift += squared_distance(&centroids.row(c), &row.view());
                    centroids.row_mut(c).assign(&row);
                    continue;
                }
                let new_centroid = sums.row(c).mapv(|v| v / counts[c] as f64);
                shift += squared_distance(&centroids.row(c), &new_centroid.view());
                centroids.row_mut(c).assign(&new_centroid);
            }

            if shift < CONVERGENCE_TOL {
                debug!(iteration, "kmeans converged");
                break;
            }
        }

        Ok(Self {
            centroids,
            random_state: seed,
        })
    }

    /// Assign each row of `x` to its nearest centroid. Read-only: this is
    /// the only operation performed at inference time.
    pub fn assign(&self, x: &Array2<f64>) -> Result<Vec<u32>> {
        if x.ncols() != self.dims() {
            return Err(LearningError::ShapeMismatch(format!(
                "partitioner was fit in {} dims, got {}",
                self.dims(),
                x.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| nearest_centroid(&row, &self.centroids) as u32)
            .collect())
    }

    /// Within-cluster sum of squares on the given data.
    pub fn wcss(&self, x: &Array2<f64>) -> f64 {
        x.rows()
            .into_iter()
            .map(|row| {
                let c = nearest_centroid(&row, &self.centroids);
                squared_distance(&self.centroids.row(c), &row)
            })
            .sum()
    }

    /// Serialize the partitioner for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Reload a persisted partitioner.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Result of fitting the clustering engine on a training batch.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    /// The fitted routing artifact.
    pub partitioner: KMeansPartitioner,
    /// Per-row dense cluster ids, aligned with the input rows.
    pub assignments: Vec<u32>,
    /// WCSS per candidate k, kept for observability.
    pub wcss_curve: Vec<(usize, f64)>,
}

/// Scan candidate cluster counts `1..=max_clusters`, pick the knee of the
/// WCSS curve, and fit the final partitioner with that k.
pub fn fit_with_elbow(x: &Array2<f64>, max_clusters: usize, seed: u64) -> Result<ClusteringOutcome> {
    let n = x.nrows();
    if n == 0 {
        return Err(LearningError::ShapeMismatch(
            "cannot cluster an empty table".to_string(),
        ));
    }

    let upper = max_clusters.min(n);
    let mut curve = Vec::with_capacity(upper);
    for k in 1..=upper {
        let model = KMeansPartitioner::fit(x, k, seed)?;
        let wcss = model.wcss(x);
        debug!(k, wcss, "elbow scan point");
        curve.push((k, wcss));
    }

    let chosen = knee_point(&curve);
    info!(clusters = chosen, "elbow selected cluster count");

    let partitioner = KMeansPartitioner::fit(x, chosen, seed)?;
    let assignments = partitioner.assign(x)?;

    Ok(ClusteringOutcome {
        partitioner,
        assignments,
        wcss_curve: curve,
    })
}

/// Knee of a decreasing curve: the point with the greatest perpendicular
/// distance from the chord joining the endpoints. Falls back to the first
/// candidate when the curve is too short to bend.
fn knee_point(curve: &[(usize, f64)]) -> usize {
    if curve.len() < 3 {
        return curve.first().map(|(k, _)| *k).unwrap_or(1);
    }

    let (x0, y0) = (curve[0].0 as f64, curve[0].1);
    let (x1, y1) = (
        curve[curve.len() - 1].0 as f64,
        curve[curve.len() - 1].1,
    );
    let dx = x1 - x0;
    let dy = y1 - y0;
    let norm = (dx * dx + dy * dy).sqrt();
    if norm == 0.0 {
        return curve[0].0;
    }

    let mut best_k = curve[0].0;
    let mut best_dist = f64::MIN;
    for &(k, wcss) in curve {
        let dist = ((k as f64 - x0) * dy - (wcss - y0) * dx).abs() / norm;
        if dist > best_dist {
            best_dist = dist;
            best_k = k;
        }
    }

    best_k
}

fn plus_plus_init(x: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = x.nrows();
    let mut centroids = Array2::zeros((k, x.ncols()));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&x.row(first));

    for c in 1..k {
        // Squared distance to the nearest chosen centroid, used as the
        // sampling weight.
        let distances: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                (0..c)
                    .map(|j| squared_distance(&centroids.row(j), &row))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let chosen = if total == 0.0 {
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen_range(0.0..total);
            let mut idx = n - 1;
            for (i, d) in distances.iter().enumerate() {
                if target < *d {
                    idx = i;
                    break;
                }
                target -= d;
            }
            idx
        };
        centroids.row_mut(c).assign(&x.row(chosen));
    }

    centroids
}

fn nearest_centroid(row: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_distance(&centroid, row);
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    best
}

fn farthest_point(x: &Array2<f64>, centroids: &Array2<f64>, assignments: &[usize]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MIN;
    for (i, row) in x.rows().into_iter().enumerate() {
        let dist = squared_distance(&centroids.row(assignments[i]), &row);
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated blobs around (0,0) and (10,10).
    fn two_blobs() -> Array2<f64> {
        let mut rows = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            rows.push([jitter, -jitter]);
            rows.push([10.0 + jitter, 10.0 - jitter]);
        }
        Array2::from_shape_fn((rows.len(), 2), |(r, c)| rows[r][c])
    }

    #[test]
    fn test_fit_produces_dense_nonempty_ids() {
        let x = two_blobs();
        let model = KMeansPartitioner::fit(&x, 2, 42).unwrap();
        let assignments = model.assign(&x).unwrap();

        let mut seen = [0usize; 2];
        for &a in &assignments {
            assert!(a < 2);
            seen[a as usize] += 1;
        }
        assert!(seen[0] > 0 && seen[1] > 0);
    }

    #[test]
    fn test_separated_blobs_land_in_different_clusters() {
        let x = two_blobs();
        let model = KMeansPartitioner::fit(&x, 2, 42).unwrap();
        let assignments = model.assign(&x).unwrap();

        // Rows alternate blob membership in construction order.
        assert_ne!(assignments[0], assignments[1]);
        assert_eq!(assignments[0], assignments[2]);
        assert_eq!(assignments[1], assignments[3]);
    }

    #[test]
    fn test_assign_is_deterministic_after_reload() {
        let x = two_blobs();
        let model = KMeansPartitioner::fit(&x, 2, 42).unwrap();
        let bytes = model.to_bytes().unwrap();
        let reloaded = KMeansPartitioner::from_bytes(&bytes).unwrap();

        assert_eq!(model.assign(&x).unwrap(), reloaded.assign(&x).unwrap());
    }

    #[test]
    fn test_assign_dimension_mismatch_is_error() {
        let x = two_blobs();
        let model = KMeansPartitioner::fit(&x, 2, 42).unwrap();
        let wrong = Array2::<f64>::zeros((3, 5));
        assert!(model.assign(&wrong).is_err());
    }

    #[test]
    fn test_elbow_finds_two_blobs() {
        let x = two_blobs();
        let outcome = fit_with_elbow(&x, 6, 42).unwrap();
        assert_eq!(outcome.partitioner.k(), 2);
        assert_eq!(outcome.assignments.len(), x.nrows());
        assert_eq!(outcome.wcss_curve.len(), 6);
    }

    #[test]
    fn test_wcss_decreases_with_k() {
        let x = two_blobs();
        let outcome = fit_with_elbow(&x, 4, 42).unwrap();
        let wcss: Vec<f64> = outcome.wcss_curve.iter().map(|(_, w)| *w).collect();
        assert!(wcss[0] >= wcss[1]);
        assert!(wcss[1] >= wcss[3] - 1e-9);
    }

    #[test]
    fn test_more_clusters_than_rows_is_error() {
        let x = Array2::<f64>::zeros((2, 2));
        assert!(KMeansPartitioner::fit(&x, 5, 42).is_err());
    }

    #[test]
    fn test_knee_point_on_sharp_elbow() {
        let curve = vec![
            (1, 100.0),
            (2, 20.0),
            (3, 15.0),
            (4, 12.0),
            (5, 10.0),
        ];
        assert_eq!(knee_point(&curve), 2);
    }
}
