//! Test: risk scoring through the single-step healthcare pipeline

use crate::helpers::*;
use healthflow::components::{healthcare::RISK_SCORE_COLUMN, Table, STATUS_OUTPUT};
use healthflow::execution::SchedulingStrategy;
use healthflow::pipelines::PipelineKind;

#[tokio::test]
async fn test_risk_scores_written_to_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(
        dir.path(),
        "patients.csv",
        "age,diagnosis,gender,treatment_cost,patient_id\n50,Hypertension,Male,2000,1\n",
    );
    let output = dir.path().join("scored/processed_data.csv");
    let settings = test_settings(&dir.path().join("runs"));

    let graph = PipelineKind::Healthcare.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[
            ("input_path", input.to_str().unwrap()),
            ("output_path", output.to_str().unwrap()),
        ],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_completed(&result);
    assert_eq!(
        task_output(&result, "process-healthcare-data", STATUS_OUTPUT),
        "Processed 1 records successfully"
    );

    let table = Table::read_csv(&output).unwrap();
    assert_eq!(table.column_f64(RISK_SCORE_COLUMN).unwrap(), vec![15.0]);
    assert_eq!(table.column_str("patient_id").unwrap(), vec!["1"]);
    assert_eq!(table.column_str("gender").unwrap(), vec!["Male"]);
}

#[tokio::test]
async fn test_scores_every_patient() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_patients(dir.path());
    let output = dir.path().join("processed.csv");
    let settings = test_settings(&dir.path().join("runs"));

    let graph = PipelineKind::Healthcare.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[
            ("input_path", input.to_str().unwrap()),
            ("output_path", output.to_str().unwrap()),
        ],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert_run_completed(&result);
    let scores = Table::read_csv(&output).unwrap().column_f64(RISK_SCORE_COLUMN).unwrap();
    let expected = [15.0, 23.0, 36.5, 4.2, 17.1, 2.8, 25.5, 13.8];
    assert_eq!(scores.len(), expected.len());
    for (score, want) in scores.iter().zip(expected) {
        assert!((score - want).abs() < 1e-9, "score {} != {}", score, want);
    }
}

#[tokio::test]
async fn test_missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("processed.csv");
    let missing = dir.path().join("nope.csv");
    let settings = test_settings(&dir.path().join("runs"));

    let graph = PipelineKind::Healthcare.build(&settings).unwrap();
    let result = run_local(
        graph,
        &[
            ("input_path", missing.to_str().unwrap()),
            ("output_path", output.to_str().unwrap()),
        ],
        &settings,
        SchedulingStrategy::Sequential,
    )
    .await;

    assert!(result.result.is_err());
    assert_task_failed(&result, "process-healthcare-data", "Input file not found");
    assert!(!output.exists());
}
