//! Compiled workflow files for the built-in pipelines

use healthflow::compiler::{sdk_version, Compiler};
use healthflow::core::Settings;
use healthflow::pipelines::PipelineKind;
use serde::Deserialize;
use serde_yaml::Value;

/// Compile `kind` to a temporary file and return its text and documents
fn compile(kind: PipelineKind, settings: &Settings) -> (String, Vec<Value>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(kind.default_package_path());

    let graph = kind.build(settings).unwrap();
    Compiler::from_settings(settings).compile(&graph, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let docs = serde_yaml::Deserializer::from_str(&text)
        .map(|doc| Value::deserialize(doc).unwrap())
        .collect();
    (text, docs)
}

fn strings(value: &Value) -> Vec<&str> {
    value
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

#[test]
fn test_healthcare_pipeline_workflow() {
    let (text, docs) = compile(PipelineKind::Healthcare, &Settings::default());

    assert!(text.starts_with("# PIPELINE DEFINITION\n# Name: healthcare-pipeline\n"));
    assert!(text.contains("#    input_path: str [Default: '/app/data/patients.csv']"));
    assert!(text.contains("#    output_path: str [Default: '/app/data/processed_data.csv']"));

    // No annotations, so no platform document
    assert_eq!(docs.len(), 1);
    let workflow = &docs[0];

    assert_eq!(workflow["pipelineInfo"]["name"].as_str(), Some("healthcare-pipeline"));
    assert_eq!(workflow["schemaVersion"].as_str(), Some("2.1.0"));
    assert_eq!(workflow["sdkVersion"].as_str(), Some(sdk_version().as_str()));

    let task = &workflow["root"]["dag"]["tasks"]["process-healthcare-data"];
    assert_eq!(task["componentRef"]["name"].as_str(), Some("comp-process-healthcare-data"));
    assert_eq!(
        task["inputs"]["parameters"]["input_path"]["componentInputParameter"].as_str(),
        Some("input_path")
    );
    assert!(task.get("dependentTasks").is_none());

    let container = &workflow["deploymentSpec"]["executors"]["exec-process-healthcare-data"]["container"];
    assert_eq!(container["image"].as_str(), Some("healthflow:latest"));
    assert_eq!(
        strings(&container["command"]),
        vec!["healthflow", "exec", "process_healthcare_data"]
    );
    assert_eq!(
        strings(&container["args"]),
        vec![
            "--input",
            "input_path={{$.inputs.parameters['input_path']}}",
            "--input",
            "output_path={{$.inputs.parameters['output_path']}}",
            "--output",
            "Output={{$.outputs.parameters['Output'].output_file}}",
        ]
    );

    let defaults = &workflow["root"]["inputDefinitions"]["parameters"];
    assert_eq!(defaults["input_path"]["defaultValue"].as_str(), Some("/app/data/patients.csv"));
    assert_eq!(defaults["input_path"]["parameterType"].as_str(), Some("STRING"));
}

#[test]
fn test_training_pipeline_workflow() {
    let (_, docs) = compile(PipelineKind::Training, &Settings::default());
    assert_eq!(docs.len(), 2);
    let (workflow, platform) = (&docs[0], &docs[1]);

    let tasks = &workflow["root"]["dag"]["tasks"];
    assert_eq!(
        strings(&tasks["evaluate-model"]["dependentTasks"]),
        vec!["preprocess-data", "train-model"]
    );
    assert_eq!(
        tasks["train-model"]["inputs"]["artifacts"]["processed_data_path"]["taskOutputArtifact"]["producerTask"]
            .as_str(),
        Some("preprocess-data")
    );
    assert_eq!(
        tasks["preprocess-data"]["inputs"]["artifacts"]["input_data_path"]["taskOutputArtifact"]
            ["outputArtifactKey"]
            .as_str(),
        Some("artifact")
    );
    assert_eq!(tasks["train-model"]["cachingOptions"]["enableCache"].as_bool(), Some(true));

    let importer = &workflow["deploymentSpec"]["executors"]["exec-import-patients"]["importer"];
    assert_eq!(importer["artifactUri"]["runtimeParameter"].as_str(), Some("uri"));
    assert_eq!(importer["typeSchema"]["schemaTitle"].as_str(), Some("system.Dataset"));

    let evaluate = &workflow["components"]["comp-evaluate-model"];
    assert_eq!(
        evaluate["outputDefinitions"]["artifacts"]["metrics_path"]["artifactType"]["schemaTitle"].as_str(),
        Some("system.Metrics")
    );

    // Every task carries the observability annotations
    let executors = &platform["platforms"]["kubernetes"]["deploymentSpec"]["executors"];
    for task in ["import-patients", "preprocess-data", "train-model", "evaluate-model"] {
        let annotations = &executors[format!("exec-{}", task).as_str()]["podMetadata"]["annotations"];
        assert_eq!(annotations["prometheus.io/scrape"].as_str(), Some("true"), "{}", task);
        assert_eq!(annotations["sidecar.istio.io/inject"].as_str(), Some("false"), "{}", task);
    }
}

#[test]
fn test_gcs_pipeline_workflow() {
    let (text, docs) = compile(PipelineKind::GcsTraining, &Settings::default());
    assert!(text.contains("#    gcs_uri: str [Default: 'gs://healthcare-ml-data/patients.csv']"));

    let workflow = &docs[0];
    let container = &workflow["deploymentSpec"]["executors"]["exec-download-data"]["container"];
    assert_eq!(container["image"].as_str(), Some("google/cloud-sdk:slim"));
    assert_eq!(strings(&container["command"]), vec!["gsutil", "cp"]);
    assert_eq!(
        strings(&container["args"]),
        vec!["{{$.inputs.parameters['gcs_uri']}}", "{{$.outputs.artifacts['data'].path}}"]
    );

    let preprocess = &workflow["root"]["dag"]["tasks"]["preprocess-data"];
    assert_eq!(strings(&preprocess["dependentTasks"]), vec!["download-data"]);
}

#[test]
fn test_settings_flow_into_workflow() {
    let settings = Settings::from_yaml(
        r#"
image: registry.example.com/healthflow:2.0
executable: /usr/local/bin/healthflow
enable_caching: false
annotations: {}
"#,
    )
    .unwrap();

    let (_, docs) = compile(PipelineKind::Training, &settings);
    assert_eq!(docs.len(), 1);

    let workflow = &docs[0];
    let container = &workflow["deploymentSpec"]["executors"]["exec-train-model"]["container"];
    assert_eq!(container["image"].as_str(), Some("registry.example.com/healthflow:2.0"));
    assert_eq!(strings(&container["command"])[0], "/usr/local/bin/healthflow");
    assert_eq!(
        workflow["root"]["dag"]["tasks"]["train-model"]["cachingOptions"]["enableCache"].as_bool(),
        Some(false)
    );
}

#[test]
fn test_forest_settings_reach_train_model() {
    let settings = Settings::from_yaml(
        r#"
forest:
  n_estimators: 7
  random_state: 1234
"#,
    )
    .unwrap();

    let (_, docs) = compile(PipelineKind::Training, &settings);
    let executors = &docs[0]["deploymentSpec"]["executors"];

    let train_args = strings(&executors["exec-train-model"]["container"]["args"]);
    let forest: Vec<&str> = train_args
        .windows(2)
        .filter(|pair| pair[0] == "--forest")
        .map(|pair| pair[1])
        .collect();
    assert!(forest.contains(&"n_estimators=7"), "{:?}", train_args);
    assert!(forest.contains(&"random_state=1234"), "{:?}", train_args);
    assert!(forest.contains(&"max_depth=none"), "{:?}", train_args);

    // Steps without a forest get no hyperparameters
    let preprocess_args = strings(&executors["exec-preprocess-data"]["container"]["args"]);
    assert!(!preprocess_args.contains(&"--forest"));
}
