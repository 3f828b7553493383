//! Serialized form of a compiled workflow
//!
//! Field names follow the orchestrator's pipeline IR. Every map is a
//! `BTreeMap` so the same graph always serializes to the same bytes.

use serde::Serialize;
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "2.1.0";
pub const ARTIFACT_SCHEMA_VERSION: &str = "0.0.1";
pub const PARAMETER_TYPE_STRING: &str = "STRING";

/// Main workflow document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub components: BTreeMap<String, ComponentSpec>,
    pub deployment_spec: DeploymentSpec,
    pub pipeline_info: PipelineInfo,
    pub root: RootSpec,
    pub schema_version: String,
    pub sdk_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_definitions: Option<IoDefinitions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_definitions: Option<IoDefinitions>,
    pub executor_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IoDefinitions {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, ArtifactSpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl IoDefinitions {
    /// `None` when nothing is declared, so the key is left out
    pub fn non_empty(self) -> Option<Self> {
        if self.artifacts.is_empty() && self.parameters.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub parameter_type: String,
}

impl ParameterSpec {
    pub fn string(default_value: Option<String>) -> Self {
        Self {
            default_value,
            parameter_type: PARAMETER_TYPE_STRING.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSpec {
    pub artifact_type: TypeSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    pub schema_title: String,
    pub schema_version: String,
}

impl TypeSchema {
    pub fn new(schema_title: &str) -> Self {
        Self {
            schema_title: schema_title.to_string(),
            schema_version: ARTIFACT_SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentSpec {
    pub executors: BTreeMap<String, ExecutorSpec>,
}

/// Exactly one of `container` or `importer` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerExecutor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importer: Option<ImporterExecutor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerExecutor {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub command: Vec<String>,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterExecutor {
    pub artifact_uri: ArtifactUri,
    pub type_schema: TypeSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUri {
    pub runtime_parameter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSpec {
    pub dag: Dag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_definitions: Option<IoDefinitions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dag {
    pub tasks: BTreeMap<String, DagTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagTask {
    pub caching_options: CachingOptions,
    pub component_ref: ComponentRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependent_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<TaskInputs>,
    pub task_info: TaskInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingOptions {
    pub enable_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskInputs {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, ArtifactInput>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInput {
    pub task_output_artifact: TaskOutputArtifact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputArtifact {
    pub output_artifact_key: String,
    pub producer_task: String,
}

/// Exactly one source is set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_input_parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_value: Option<RuntimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_output_parameter: Option<TaskOutputParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeValue {
    pub constant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputParameter {
    pub output_parameter_key: String,
    pub producer_task: String,
}

/// Second document carrying platform-specific settings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    pub platforms: Platforms,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Platforms {
    pub kubernetes: KubernetesPlatform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesPlatform {
    pub deployment_spec: KubernetesDeployment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KubernetesDeployment {
    pub executors: BTreeMap<String, KubernetesExecutor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesExecutor {
    pub pod_metadata: PodMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodMetadata {
    pub annotations: BTreeMap<String, String>,
}
