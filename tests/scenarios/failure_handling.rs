//! Test: a failing task skips its dependents, independent branches finish

use crate::helpers::*;
use healthflow::core::{ExecutionStatus, PipelineDefinition, TaskState};
use healthflow::execution::{ExecutionError, ExecutionEvent, SchedulingStrategy};
use healthflow::pipelines::PipelineKind;

#[tokio::test]
async fn test_missing_column_skips_downstream() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_file(
        dir.path(),
        "no_gender.csv",
        "patient_id,age,diagnosis,treatment_cost\n1,50,Hypertension,2000\n",
    );
    let settings = test_settings(&dir.path().join("runs"));

    let graph = PipelineKind::Training.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[("input_data_path", data.to_str().unwrap())],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    match &result.result {
        Err(ExecutionError::RunFailed { pipeline, failed }) => {
            assert_eq!(pipeline, "healthcare-training-pipeline");
            assert_eq!(failed, &vec!["preprocess-data".to_string()]);
        }
        other => panic!("expected RunFailed, got {:?}", other),
    }

    assert!(result.run.task_state("import-patients").unwrap().is_completed());
    assert_task_failed(&result, "preprocess-data", "Missing column: gender");
    assert_task_skipped(&result, "train-model");
    assert_task_skipped(&result, "evaluate-model");

    assert_eq!(result.run.state.status, ExecutionStatus::Failed);
    assert_eq!(result.run.state.failed_tasks, 1);
    assert_eq!(result.run.state.skipped_tasks, 2);
    assert_eq!(started_order(&result), vec!["import-patients", "preprocess-data"]);

    // Nothing was written for tasks that never ran
    assert!(!result.run.run_dir.join("train-model").exists());
}

#[tokio::test]
async fn test_independent_branch_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_patients(dir.path());
    let settings = test_settings(&dir.path().join("runs"));

    let yaml = r#"
name: two-cohorts
parameters:
  good_cohort: ~
tasks:
  - id: import-good
    step: importer
    inputs:
      uri: "{{ params.good_cohort }}"
  - id: import-bad
    step: importer
    inputs:
      uri: /does/not/exist.csv
  - id: preprocess-good
    step: preprocess_data
    inputs:
      input_data_path: "{{ tasks.import-good.outputs.artifact }}"
  - id: preprocess-bad
    step: preprocess_data
    inputs:
      input_data_path: "{{ tasks.import-bad.outputs.artifact }}"
  - id: train-bad
    step: train_model
    inputs:
      processed_data_path: "{{ tasks.preprocess-bad.outputs.processed_data_path }}"
"#;
    let graph = PipelineDefinition::from_yaml(yaml).unwrap().to_graph(&settings).unwrap();

    let result = run_local(
        graph,
        &[("good_cohort", good.to_str().unwrap())],
        &settings,
        SchedulingStrategy::Parallel,
    )
    .await;

    assert!(result.result.is_err());
    assert_task_failed(&result, "preprocess-bad", "Input file not found");
    assert_task_skipped(&result, "train-bad");
    assert!(matches!(
        result.run.task_state("preprocess-good"),
        Some(TaskState::Completed { .. })
    ));
    assert!(result.events.iter().any(
        |e| matches!(e, ExecutionEvent::TaskSkipped { task_id, .. } if task_id == "train-bad")
    ));
}

#[tokio::test]
async fn test_missing_parameter_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(&dir.path().join("runs"));
    let graph = PipelineDefinition::from_yaml(
        r#"
name: needs-input
parameters:
  data: ~
tasks:
  - id: import
    step: importer
    inputs:
      uri: "{{ params.data }}"
"#,
    )
    .unwrap()
    .to_graph(&settings)
    .unwrap();

    let err = healthflow::core::PipelineRun::new(graph, &Default::default(), &settings.work_dir).unwrap_err();
    assert_eq!(err.to_string(), "Parameter 'data' has no default and was not provided");
}
