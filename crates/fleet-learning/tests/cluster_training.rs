//! End-to-end training over a segmented feature space: cluster discovery,
//! per-cluster tuning, and routing consistency across a serialize/reload
//! cycle.

use fleet_learning::{
    ClusterTuner, KMeansPartitioner, ModelKey, ModelRecord, TrainingConfig, fit_with_elbow,
};
use ndarray::{Array1, Array2, Axis};
use pretty_assertions::assert_eq;

/// Two separated regions, each with its own internal decision boundary.
///
/// Region A sits around x0=0, region B around x0=20. Within each region the
/// label flips on the second feature, so a single global model and the
/// per-cluster models face genuinely different problems.
fn segmented_data() -> (Array2<f64>, Array1<u8>) {
    let n = 80;
    let x = Array2::from_shape_fn((n, 3), |(r, c)| {
        let region = if r < n / 2 { 0.0 } else { 20.0 };
        match c {
            0 => region + (r % 7) as f64 * 0.1,
            1 => (r % 10) as f64,
            _ => ((r * 3) % 5) as f64 * 0.2,
        }
    });
    let y = Array1::from_shape_fn(n, |r| u8::from(r % 10 >= 5));
    (x, y)
}

fn rows_of_cluster(
    x: &Array2<f64>,
    y: &Array1<u8>,
    assignments: &[u32],
    cluster_id: u32,
) -> (Array2<f64>, Array1<u8>) {
    let idx: Vec<usize> = assignments
        .iter()
        .enumerate()
        .filter(|&(_, &a)| a == cluster_id)
        .map(|(i, _)| i)
        .collect();
    let xs = x.select(Axis(0), &idx);
    let ys = Array1::from_iter(idx.iter().map(|&i| y[i]));
    (xs, ys)
}

#[test]
fn test_full_training_round_over_discovered_clusters() {
    let (x, y) = segmented_data();
    let config = TrainingConfig::default();

    let outcome = fit_with_elbow(&x, config.max_clusters, config.random_state).unwrap();
    assert_eq!(outcome.partitioner.k(), 2);
    assert_eq!(outcome.assignments.len(), x.nrows());

    let tuner = ClusterTuner::new(config);
    let mut records = Vec::new();
    for cluster_id in 0..outcome.partitioner.k() as u32 {
        let (cx, cy) = rows_of_cluster(&x, &y, &outcome.assignments, cluster_id);
        assert!(cx.nrows() > 0, "cluster {cluster_id} is empty");
        let record = tuner.tune_cluster(cluster_id, &cx, &cy).unwrap();
        assert_eq!(record.key.cluster_id, cluster_id);
        assert!(record.validation_score > 0.5);
        records.push(record);
    }

    // One model per cluster under distinct structured keys.
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].key.storage_key(), records[1].key.storage_key());
}

#[test]
fn test_routing_is_identical_after_partitioner_reload() {
    let (x, _) = segmented_data();
    let config = TrainingConfig::default();

    let outcome = fit_with_elbow(&x, config.max_clusters, config.random_state).unwrap();
    let bytes = outcome.partitioner.to_bytes().unwrap();
    let reloaded = KMeansPartitioner::from_bytes(&bytes).unwrap();

    // The reloaded partitioner must route every training row to the same
    // cluster it was trained in.
    assert_eq!(reloaded.assign(&x).unwrap(), outcome.assignments);
}

#[test]
fn test_persisted_record_predicts_like_the_original() {
    let (x, y) = segmented_data();
    let tuner = ClusterTuner::new(TrainingConfig::default());
    let record = tuner.tune_cluster(0, &x, &y).unwrap();

    let restored = ModelRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.model.predict(&x), record.model.predict(&x));
    assert_eq!(restored.key, record.key);
}

#[test]
fn test_model_keys_parse_back_from_storage_form() {
    let (x, y) = segmented_data();
    let tuner = ClusterTuner::new(TrainingConfig::default());
    let record = tuner.tune_cluster(5, &x, &y).unwrap();

    let parsed = ModelKey::parse(&record.key.storage_key()).unwrap();
    assert_eq!(parsed, record.key);
}
