//! End-to-end train and predict runs against a temporary workspace.
//!
//! The batch mirrors the production shape: files named
//! `<prefix>_<date>_<time>.csv`, a mostly-missing sensor column, a constant
//! sensor column, a 70/30 `class` label, and two well-separated operating
//! regimes so clustering has real structure to find.

use fleet_pipeline::{
    ArtifactStore, LocalStore, PipelineError, PipelineSettings, PredictPipeline, Probe,
    TrainPipeline,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FEATURE_COLUMNS: [&str; 9] = [
    "aa_000", "ab_000", "ac_000", "ad_000", "ae_000", "af_000", "ag_000", "ah_000", "ai_000",
];

fn write_schema(path: &Path, with_label: bool) {
    let mut columns: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    if with_label {
        columns.insert(0, "class".to_string());
    }
    let schema = serde_json::json!({
        "sample_file_prefix": "aps_failure",
        "date_stamp_length": 8,
        "time_stamp_length": 6,
        "column_count": columns.len(),
        "column_names": columns,
    });
    fs::write(path, serde_json::to_string_pretty(&schema).unwrap()).unwrap();
}

/// Feature values for one observation. Rows in the second regime sit far
/// from the first, so the partitioner separates them cleanly.
fn feature_values(i: usize) -> Vec<String> {
    let base = if i < 50 { 0.0 } else { 50.0 };
    // ad_000 carries one real value per file so no file has a fully-empty
    // column; the column still crosses the 0.6 missing threshold overall.
    let ad = if i % 50 == 0 { "5".to_string() } else { "na".to_string() };
    vec![
        format!("{:.3}", base + (i % 7) as f64 * 0.25),
        format!("{:.3}", base + (i % 5) as f64 * 0.3),
        format!("{:.3}", base * 0.5 + (i % 9) as f64 * 0.2),
        ad,
        "3".to_string(),
        format!("{:.3}", base * 0.1 + (i % 4) as f64),
        format!("{:.3}", base + ((i * 3) % 11) as f64 * 0.15),
        format!("{:.3}", base * 0.2 + (i % 6) as f64 * 0.4),
        format!("{:.3}", base + (i % 8) as f64 * 0.1),
    ]
}

fn label(i: usize) -> &'static str {
    if i % 10 < 7 { "neg" } else { "pos" }
}

fn write_train_file(path: &Path, rows: std::ops::Range<usize>) {
    let mut csv = String::from("class,");
    csv.push_str(&FEATURE_COLUMNS.join(","));
    csv.push('\n');
    for i in rows {
        csv.push_str(label(i));
        csv.push(',');
        csv.push_str(&feature_values(i).join(","));
        csv.push('\n');
    }
    fs::write(path, csv).unwrap();
}

fn write_predict_file(path: &Path, rows: std::ops::Range<usize>) {
    let mut csv = String::from(&FEATURE_COLUMNS.join(","));
    csv.push('\n');
    for i in rows {
        csv.push_str(&feature_values(i).join(","));
        csv.push('\n');
    }
    fs::write(path, csv).unwrap();
}

struct Workspace {
    _dir: TempDir,
    train_settings: PipelineSettings,
    predict_settings: PipelineSettings,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let train_in = root.join("train_in");
    let predict_in = root.join("predict_in");
    fs::create_dir_all(&train_in).unwrap();
    fs::create_dir_all(&predict_in).unwrap();

    write_schema(&root.join("schema_training.json"), true);
    write_schema(&root.join("schema_prediction.json"), false);

    write_train_file(&train_in.join("aps_failure_20240101_120000.csv"), 0..50);
    write_train_file(&train_in.join("aps_failure_20240101_130000.csv"), 50..100);
    // Each range contains a multiple of 50 so every file carries the one
    // real ad_000 value and no file trips the fully-empty-column check.
    write_predict_file(&predict_in.join("aps_failure_20240201_090000.csv"), 0..20);
    write_predict_file(&predict_in.join("aps_failure_20240201_100000.csv"), 50..70);

    let mut train_settings = PipelineSettings {
        schema_path: root.join("schema_training.json"),
        input_dir: train_in,
        staging_dir: root.join("staging"),
        store_dir: root.join("store"),
        tracking_path: root.join("tracking/runs.jsonl"),
        ..PipelineSettings::default()
    };
    train_settings.training.max_clusters = 4;

    let mut predict_settings = train_settings.clone();
    predict_settings.schema_path = root.join("schema_prediction.json");
    predict_settings.input_dir = predict_in;

    Workspace {
        _dir: dir,
        train_settings,
        predict_settings,
    }
}

fn store_for(settings: &PipelineSettings) -> LocalStore {
    LocalStore::new(&settings.store_dir)
}

// ============================================================
// Training runs
// ============================================================

#[test]
fn test_training_persists_one_model_per_cluster() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    let outcome = TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();

    assert!(outcome.cluster_count >= 1);
    assert_eq!(
        outcome.trained.len() + outcome.skipped.len(),
        outcome.cluster_count
    );
    assert!(!outcome.trained.is_empty());

    // Routing artifact plus exactly one persisted model per trained cluster.
    assert_eq!(
        store.probe("artifacts/partitioner.json").unwrap(),
        Probe::Found
    );
    let models = store.list("models/").unwrap();
    assert_eq!(models.len(), outcome.trained.len());
    for key in &outcome.trained {
        assert_eq!(
            store.probe(&format!("models/{}", key.storage_key())).unwrap(),
            Probe::Found
        );
    }
}

#[test]
fn test_two_regimes_are_discovered() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    let outcome = TrainPipeline::new(ws.train_settings.clone(), store)
        .run()
        .unwrap();

    // The two operating regimes are 50 apart in every base feature; the
    // elbow lands on two clusters of 50 rows each, both trainable.
    assert_eq!(outcome.cluster_count, 2);
    assert_eq!(outcome.trained.len(), 2);
    assert!(outcome.skipped.is_empty());
}

#[test]
fn test_invalid_file_is_excluded_not_fatal() {
    let ws = workspace();
    // Misnamed file in the batch.
    fs::write(
        ws.train_settings.input_dir.join("notes_20240101.csv"),
        "a,b\n1,2\n",
    )
    .unwrap();

    let store = store_for(&ws.train_settings);
    let outcome = TrainPipeline::new(ws.train_settings.clone(), store)
        .run()
        .unwrap();
    assert!(!outcome.trained.is_empty());

    // The rejection lands in the invalid staging area with its reason.
    let invalid = ws.train_settings.staging_dir.join("train/invalid");
    assert!(invalid.join("notes_20240101.csv.rejected").exists());
}

#[test]
fn test_training_rerun_overwrites_cleanly() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);

    let first = TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();
    let second = TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();

    assert_eq!(first.cluster_count, second.cluster_count);
    assert_eq!(first.trained, second.trained);
    assert_eq!(
        store.list("models/").unwrap().len(),
        second.trained.len()
    );
}

#[test]
fn test_training_logs_runs_to_tracker() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    let outcome = TrainPipeline::new(ws.train_settings.clone(), store)
        .run()
        .unwrap();

    let contents = fs::read_to_string(&ws.train_settings.tracking_path).unwrap();
    assert_eq!(contents.lines().count(), outcome.trained.len());
    for line in contents.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(record["validation_score"].is_number());
        assert!(record["cluster_id"].is_number());
    }
}

// ============================================================
// Prediction runs
// ============================================================

#[test]
fn test_prediction_round_trip() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();

    let outcome = PredictPipeline::new(ws.predict_settings.clone(), store.clone(), "local")
        .run()
        .unwrap();

    assert_eq!(outcome.output_location, "local");
    assert_eq!(outcome.output_key, "predictions/predictions.csv");
    assert_eq!(store.probe(&outcome.output_key).unwrap(), Probe::Found);

    // Output carries one row per incoming observation plus the mapped
    // domain labels.
    let csv = String::from_utf8(store.load(&outcome.output_key).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 41); // header + 40 rows
    assert!(lines[0].ends_with("prediction"));
    for line in &lines[1..] {
        let last = line.rsplit(',').next().unwrap();
        assert!(last == "neg" || last == "pos", "unexpected label '{last}'");
    }

    let sample: Vec<serde_json::Value> = serde_json::from_str(&outcome.sample_json).unwrap();
    assert_eq!(sample.len(), 10);
    assert!(sample[0]["prediction"].is_string());
}

#[test]
fn test_prediction_rerun_replaces_prior_output() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();

    let pipeline = PredictPipeline::new(ws.predict_settings.clone(), store.clone(), "local");
    let first = pipeline.run().unwrap();
    let second = pipeline.run().unwrap();

    assert_eq!(first.output_key, second.output_key);
    assert_eq!(store.probe(&second.output_key).unwrap(), Probe::Found);
}

#[test]
fn test_missing_model_is_fatal_and_writes_nothing() {
    let ws = workspace();
    let store = store_for(&ws.train_settings);
    let trained = TrainPipeline::new(ws.train_settings.clone(), store.clone())
        .run()
        .unwrap();

    // Remove every model; whatever cluster the batch routes to first can
    // no longer be served.
    let known_ids: Vec<u32> = trained.trained.iter().map(|k| k.cluster_id).collect();
    for key in store.list("models/").unwrap() {
        store.delete(&key).unwrap();
    }

    let err = PredictPipeline::new(ws.predict_settings.clone(), store.clone(), "local")
        .run()
        .unwrap_err();
    match err {
        PipelineError::ClusterRoutingFailure { cluster_id } => {
            assert!(known_ids.contains(&cluster_id), "unknown cluster {cluster_id}");
        }
        other => panic!("expected routing failure, got {other}"),
    }

    // No partial output artifact.
    assert_eq!(
        store
            .probe(&ws.predict_settings.prediction_key)
            .unwrap(),
        Probe::NotFound
    );
}

#[test]
fn test_prediction_without_training_artifacts_fails() {
    let ws = workspace();
    let store = store_for(&ws.predict_settings);
    let err = PredictPipeline::new(ws.predict_settings.clone(), store, "local")
        .run()
        .unwrap_err();
    assert_eq!(err.error_code(), "STORAGE_FAILURE");
}
