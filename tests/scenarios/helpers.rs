//! Test utility functions for healthflow scenarios

use healthflow::core::{PipelineGraph, PipelineRun, Settings, TaskState};
use healthflow::execution::{ExecutionEngine, ExecutionError, ExecutionEvent, LocalExecutor, SchedulingStrategy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Raw patient records, as exported by the hospital system
pub const PATIENTS_CSV: &str = "\
patient_id,age,gender,diagnosis,treatment_cost
1,50,Male,Hypertension,2000
2,30,Female,HeartDisease,5000
3,65,Male,Hypertension HeartDisease,8000
4,42,Female,Diabetes,1500
5,71,Female,Hypertension,3000
6,28,Male,Asthma,900
7,55,Male,HeartDisease,6500
8,38,Female,Hypertension,2200
";

/// Result of a local run
pub struct RunResult {
    pub run: PipelineRun,
    pub result: Result<(), ExecutionError>,
    pub events: Vec<ExecutionEvent>,
}

/// Write `PATIENTS_CSV` into `dir`
pub fn write_patients(dir: &Path) -> PathBuf {
    write_file(dir, "patients.csv", PATIENTS_CSV)
}

pub fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Default settings with a small forest and runs under `work_dir`
pub fn test_settings(work_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.work_dir = work_dir.to_path_buf();
    settings.forest.n_estimators = 5;
    settings.container_timeout_secs = 30;
    settings
}

/// Run `graph` with the local executor and collect every event
pub async fn run_local(
    graph: PipelineGraph,
    params: &[(&str, &str)],
    settings: &Settings,
    strategy: SchedulingStrategy,
) -> RunResult {
    let overrides: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut run = PipelineRun::new(graph, &overrides, &settings.work_dir).unwrap();

    let executor = LocalExecutor::new(settings.forest.clone(), settings.container_timeout_secs);
    let mut engine = ExecutionEngine::new(executor, strategy);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let result = engine.execute(&mut run).await;
    let events = events.lock().unwrap().clone();
    RunResult { run, result, events }
}

/// Assert the run finished without failures
pub fn assert_run_completed(result: &RunResult) {
    if let Err(e) = &result.result {
        panic!("Run failed: {}\nStates: {:#?}", e, result.run.task_states());
    }
    assert!(result.run.is_complete());
    assert!(!result.run.has_failed());
}

/// Output value or artifact path of a completed task
pub fn task_output<'a>(result: &'a RunResult, task_id: &str, output: &str) -> &'a str {
    match result.run.task_state(task_id) {
        Some(TaskState::Completed { outputs, .. }) => outputs
            .get(output)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("Task {} has no output {}", task_id, output)),
        other => panic!("Task {} not completed: {:?}", task_id, other),
    }
}

pub fn assert_task_failed(result: &RunResult, task_id: &str, error_contains: &str) {
    match result.run.task_state(task_id) {
        Some(TaskState::Failed { error, .. }) => assert!(
            error.contains(error_contains),
            "Task {} error '{}' does not contain '{}'",
            task_id,
            error,
            error_contains
        ),
        other => panic!("Task {} expected to fail, got {:?}", task_id, other),
    }
}

pub fn assert_task_skipped(result: &RunResult, task_id: &str) {
    assert!(
        matches!(result.run.task_state(task_id), Some(TaskState::Skipped { .. })),
        "Task {} expected to be skipped, got {:?}",
        task_id,
        result.run.task_state(task_id)
    );
}

/// Task IDs in the order they started
pub fn started_order(result: &RunResult) -> Vec<String> {
    result
        .events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::TaskStarted { task_id } => Some(task_id.clone()),
            _ => None,
        })
        .collect()
}
