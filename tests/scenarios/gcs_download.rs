//! Test: the object-storage pipeline with a local copy command standing in
//! for the storage utility

use crate::helpers::*;
use healthflow::components::EvaluationMetrics;
use healthflow::execution::SchedulingStrategy;
use healthflow::pipelines::PipelineKind;
use std::path::Path;

#[tokio::test]
async fn test_download_feeds_training_chain() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_patients(dir.path());
    let mut settings = test_settings(&dir.path().join("runs"));
    settings.storage_copy_command = vec!["cp".to_string()];

    let graph = PipelineKind::GcsTraining.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[("gcs_uri", source.to_str().unwrap())],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_completed(&result);

    let downloaded = task_output(&result, "download-data", "data");
    assert_eq!(
        Path::new(downloaded),
        result.run.run_dir.join("download-data").join("data.csv")
    );
    assert_eq!(std::fs::read_to_string(downloaded).unwrap(), PATIENTS_CSV);

    let metrics = EvaluationMetrics::load(Path::new(task_output(&result, "evaluate-model", "metrics_path")));
    assert!(metrics.is_ok());
}

#[tokio::test]
async fn test_failed_copy_skips_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings(&dir.path().join("runs"));
    settings.storage_copy_command = vec!["cp".to_string()];
    let missing = dir.path().join("not-there.csv");

    let graph = PipelineKind::GcsTraining.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[("gcs_uri", missing.to_str().unwrap())],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert!(result.result.is_err());
    assert_task_failed(&result, "download-data", "cp exited with code");
    for task in ["preprocess-data", "train-model", "evaluate-model"] {
        assert_task_skipped(&result, task);
    }
}
