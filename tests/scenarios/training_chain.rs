//! Test: preprocess -> train -> evaluate on a local dataset

use crate::helpers::*;
use healthflow::components::{EvaluationMetrics, RandomForestRegressor, Table};
use healthflow::execution::{ExecutionEvent, SchedulingStrategy};
use healthflow::pipelines::PipelineKind;
use std::path::Path;

#[tokio::test]
async fn test_training_chain_produces_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_patients(dir.path());
    let settings = test_settings(&dir.path().join("runs"));

    let graph = PipelineKind::Training.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[("input_data_path", data.to_str().unwrap())],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_completed(&result);
    assert_eq!(
        started_order(&result),
        vec!["import-patients", "preprocess-data", "train-model", "evaluate-model"]
    );

    // The importer hands the dataset through untouched
    assert_eq!(task_output(&result, "import-patients", "artifact"), data.to_str().unwrap());

    let run_dir = &result.run.run_dir;
    let processed = task_output(&result, "preprocess-data", "processed_data_path");
    assert_eq!(
        Path::new(processed),
        run_dir.join("preprocess-data").join("processed_data_path.csv")
    );

    let table = Table::read_csv(Path::new(processed)).unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(
        table.column_str("gender_Male").unwrap(),
        vec!["1", "0", "1", "0", "0", "1", "1", "0"]
    );
    assert_eq!(table.column_f64("scaled_treatment_cost").unwrap()[0], 2.0);
    assert!(!table.has_column("patient_id"));

    let model_path = task_output(&result, "train-model", "model_path");
    assert!(model_path.ends_with("model_path.json"));
    let model = RandomForestRegressor::load(Path::new(model_path)).unwrap();
    assert_eq!(model.n_trees(), 5);

    let metrics_path = task_output(&result, "evaluate-model", "metrics_path");
    let metrics = EvaluationMetrics::load(Path::new(metrics_path)).unwrap();
    assert!(metrics.mse >= 0.0);
    assert!(metrics.r2_score <= 1.0);
}

#[tokio::test]
async fn test_parallel_strategy_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_patients(dir.path());
    let settings = test_settings(&dir.path().join("runs"));
    let params = [("input_data_path", data.to_str().unwrap())];

    let sequential = run_local(
        PipelineKind::Training.build(&settings).unwrap(),
        &params,
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;
    let parallel = run_local(
        PipelineKind::Training.build(&settings).unwrap(),
        &params,
        &settings,
        SchedulingStrategy::Parallel,
    )
    .await;

    assert_run_completed(&sequential);
    assert_run_completed(&parallel);
    assert_ne!(sequential.run.run_dir, parallel.run.run_dir);

    // Same seed, same data: same model
    let load = |r: &RunResult| {
        EvaluationMetrics::load(Path::new(task_output(r, "evaluate-model", "metrics_path"))).unwrap()
    };
    assert_eq!(load(&sequential), load(&parallel));
}

#[tokio::test]
async fn test_events_bracket_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_patients(dir.path());
    let settings = test_settings(&dir.path().join("runs"));

    let result = run_local(
        PipelineKind::Training.build(&settings).unwrap(),
        &[("input_data_path", data.to_str().unwrap())],
        &settings,
        SchedulingStrategy::LimitedParallel(2),
    )
    .await;

    assert_run_completed(&result);
    assert!(matches!(
        result.events.first(),
        Some(ExecutionEvent::RunStarted { total_tasks: 4, .. })
    ));
    assert!(matches!(result.events.last(), Some(ExecutionEvent::RunCompleted { .. })));
    let completed = result
        .events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::TaskCompleted { .. }))
        .count();
    assert_eq!(completed, 4);
}
