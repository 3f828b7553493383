//! Test: pipelines described in YAML definition files

use crate::helpers::*;
use healthflow::compiler::Compiler;
use healthflow::components::{healthcare::RISK_SCORE_COLUMN, Table};
use healthflow::core::{DefinitionError, PipelineDefinition};
use healthflow::execution::SchedulingStrategy;
use std::path::Path;

const DEFINITION: &str = r#"
name: nightly-scoring
description: "Score patients, then train on the same export"
parameters:
  export: /data/export.csv
  scored: /data/scored.csv
tasks:
  - id: score
    step: process_healthcare_data
    inputs:
      input_path: "{{ params.export }}"
      output_path: "{{ params.scored }}"
  - id: import
    step: importer
    inputs:
      uri: "{{ params.export }}"
    depends_on: [score]
  - id: preprocess
    step: preprocess_data
    inputs:
      input_data_path: "{{ tasks.import.outputs.artifact }}"
    annotations:
      team: analytics
  - id: train
    step: train_model
    inputs:
      processed_data_path: "{{ tasks.preprocess.outputs.processed_data_path }}"
"#;

#[tokio::test]
async fn test_definition_file_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let export = write_patients(dir.path());
    let scored = dir.path().join("scored.csv");
    let definition_path = write_file(dir.path(), "nightly.yaml", DEFINITION);
    let settings = test_settings(&dir.path().join("runs"));

    let definition = PipelineDefinition::from_file(&definition_path).unwrap();
    let graph = definition.to_graph(&settings).unwrap();
    assert_eq!(graph.execution_order(), vec!["score", "import", "preprocess", "train"]);

    let result = run_local(
        graph,
        &[
            ("export", export.to_str().unwrap()),
            ("scored", scored.to_str().unwrap()),
        ],
        &settings,
        SchedulingStrategy::Parallel,
    )
    .await;

    assert_run_completed(&result);
    assert_eq!(started_order(&result), vec!["score", "import", "preprocess", "train"]);
    assert!(Table::read_csv(&scored).unwrap().has_column(RISK_SCORE_COLUMN));
    assert!(Path::new(task_output(&result, "train", "model_path")).exists());
}

#[test]
fn test_definition_compiles_like_builtin_pipelines() {
    let settings = healthflow::core::Settings::default();
    let graph = PipelineDefinition::from_yaml(DEFINITION)
        .unwrap()
        .to_graph(&settings)
        .unwrap();

    let yaml = Compiler::from_settings(&settings).to_yaml(&graph).unwrap();
    assert!(yaml.starts_with("# PIPELINE DEFINITION\n# Name: nightly-scoring\n"));
    assert!(yaml.contains("#    export: str [Default: '/data/export.csv']"));
    assert!(yaml.contains("exec-preprocess"));
    // Only the annotated task shows up in the platform document
    let platform = yaml.split("\n---\n").nth(1).unwrap();
    assert!(platform.contains("team: analytics"));
    assert!(!platform.contains("exec-train"));
}

#[test]
fn test_cycle_is_reported() {
    let yaml = r#"
name: loop
tasks:
  - id: a
    step: importer
    inputs: { uri: "{{ tasks.b.outputs.artifact }}" }
  - id: b
    step: importer
    inputs: { uri: "{{ tasks.a.outputs.artifact }}" }
"#;
    assert!(matches!(
        PipelineDefinition::from_yaml(yaml),
        Err(DefinitionError::Cycle(_))
    ));
}

#[test]
fn test_missing_definition_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineDefinition::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, DefinitionError::Io { .. }));
}
