//! Workflow compiler
//!
//! Turns a [`PipelineGraph`] into the YAML workflow description consumed by
//! the orchestration platform. Built-in steps become container executors
//! that call back into this crate's `exec` subcommand.

pub mod workflow;

use crate::components::ForestParams;
use crate::core::{
    ContainerArg, Implementation, InputBinding, PipelineGraph, PortSpec, PortType, Settings, Step,
    Task, IMPORTER_URI_INPUT,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use workflow::*;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to write workflow to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize workflow: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Version string recorded in every compiled workflow
pub fn sdk_version() -> String {
    format!("healthflow-{}", env!("CARGO_PKG_VERSION"))
}

/// Placeholder the orchestrator replaces with an input parameter's value
pub fn input_parameter_placeholder(name: &str) -> String {
    format!("{{{{$.inputs.parameters['{}']}}}}", name)
}

/// Placeholder for the local path of an input artifact
pub fn input_artifact_placeholder(name: &str) -> String {
    format!("{{{{$.inputs.artifacts['{}'].path}}}}", name)
}

/// Placeholder for the local path an output artifact must be written to
pub fn output_artifact_placeholder(name: &str) -> String {
    format!("{{{{$.outputs.artifacts['{}'].path}}}}", name)
}

/// Placeholder for the file a string output's value must be written to
pub fn output_parameter_placeholder(name: &str) -> String {
    format!("{{{{$.outputs.parameters['{}'].output_file}}}}", name)
}

fn input_placeholder(port: &PortSpec) -> String {
    if port.port_type.is_artifact() {
        input_artifact_placeholder(&port.name)
    } else {
        input_parameter_placeholder(&port.name)
    }
}

fn output_placeholder(port: &PortSpec) -> String {
    if port.port_type.is_artifact() {
        output_artifact_placeholder(&port.name)
    } else {
        output_parameter_placeholder(&port.name)
    }
}

/// Compiles graphs to workflow files
#[derive(Debug, Clone)]
pub struct Compiler {
    /// Image running the built-in steps
    pub image: String,

    /// Executable inside `image` providing the `exec` subcommand
    pub executable: String,

    pub enable_caching: bool,

    /// Hyperparameters passed to steps that fit a forest
    pub forest: ForestParams,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl Compiler {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            image: settings.image.clone(),
            executable: settings.executable.clone(),
            enable_caching: settings.enable_caching,
            forest: settings.forest.clone(),
        }
    }

    /// Write the workflow for `graph` to `package_path`
    pub fn compile(&self, graph: &PipelineGraph, package_path: &Path) -> Result<(), CompileError> {
        info!("Compiling pipeline '{}' to {}", graph.name, package_path.display());

        let yaml = self.to_yaml(graph)?;
        if let Some(parent) = package_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CompileError::Io {
                path: package_path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(package_path, yaml).map_err(|source| CompileError::Io {
            path: package_path.to_path_buf(),
            source,
        })?;

        info!("Wrote {} tasks to {}", graph.tasks().len(), package_path.display());
        Ok(())
    }

    /// Full YAML text: header comment, workflow document and, when any
    /// task carries annotations, the platform document
    pub fn to_yaml(&self, graph: &PipelineGraph) -> Result<String, CompileError> {
        let mut out = header(graph);
        out.push_str(&serde_yaml::to_string(&self.to_workflow(graph))?);

        if let Some(platform) = platform_spec(graph) {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(&platform)?);
        }

        Ok(out)
    }

    /// Build the workflow document
    pub fn to_workflow(&self, graph: &PipelineGraph) -> Workflow {
        let mut components = BTreeMap::new();
        let mut executors = BTreeMap::new();
        let mut tasks = BTreeMap::new();

        for task in graph.tasks() {
            debug!("Compiling task '{}' ({})", task.id, task.step.name);

            components.insert(component_key(task), component_spec(task));
            executors.insert(executor_key(task), self.executor_spec(&task.step));
            tasks.insert(task.id.clone(), self.dag_task(graph, task));
        }

        let mut root_inputs = IoDefinitions::default();
        for parameter in &graph.parameters {
            root_inputs
                .parameters
                .insert(parameter.name.clone(), ParameterSpec::string(parameter.default.clone()));
        }

        Workflow {
            components,
            deployment_spec: DeploymentSpec { executors },
            pipeline_info: PipelineInfo {
                name: graph.name.clone(),
                description: graph.description.clone(),
            },
            root: RootSpec {
                dag: Dag { tasks },
                input_definitions: root_inputs.non_empty(),
            },
            schema_version: SCHEMA_VERSION.to_string(),
            sdk_version: sdk_version(),
        }
    }

    fn executor_spec(&self, step: &Step) -> ExecutorSpec {
        match &step.implementation {
            Implementation::Builtin(builtin) => {
                let command = vec![
                    self.executable.clone(),
                    "exec".to_string(),
                    builtin.name().to_string(),
                ];

                let mut args = Vec::new();
                for port in &step.inputs {
                    args.push("--input".to_string());
                    args.push(format!("{}={}", port.name, input_placeholder(port)));
                }
                for port in &step.outputs {
                    args.push("--output".to_string());
                    args.push(format!("{}={}", port.name, output_placeholder(port)));
                }
                if builtin.uses_forest() {
                    for pair in self.forest.to_pairs() {
                        args.push("--forest".to_string());
                        args.push(pair);
                    }
                }

                ExecutorSpec {
                    container: Some(ContainerExecutor {
                        args,
                        command,
                        image: self.image.clone(),
                    }),
                    ..ExecutorSpec::default()
                }
            }
            Implementation::Container(container) => {
                let args = container
                    .args
                    .iter()
                    .map(|arg| match arg {
                        ContainerArg::Literal(value) => value.clone(),
                        ContainerArg::InputValue(name) => match step.input(name) {
                            Some(port) => input_placeholder(port),
                            None => input_parameter_placeholder(name),
                        },
                        ContainerArg::OutputPath(name) => match step.output(name) {
                            Some(port) => output_placeholder(port),
                            None => output_artifact_placeholder(name),
                        },
                    })
                    .collect();

                ExecutorSpec {
                    container: Some(ContainerExecutor {
                        args,
                        command: container.command.clone(),
                        image: container.image.clone(),
                    }),
                    ..ExecutorSpec::default()
                }
            }
            Implementation::Importer(kind) => ExecutorSpec {
                importer: Some(ImporterExecutor {
                    artifact_uri: ArtifactUri {
                        runtime_parameter: IMPORTER_URI_INPUT.to_string(),
                    },
                    type_schema: TypeSchema::new(kind.schema_title()),
                }),
                ..ExecutorSpec::default()
            },
        }
    }

    fn dag_task(&self, graph: &PipelineGraph, task: &Task) -> DagTask {
        let mut inputs = TaskInputs::default();

        for (name, binding) in &task.inputs {
            let is_artifact = task
                .step
                .input(name)
                .map(|p| p.port_type.is_artifact())
                .unwrap_or(false);

            match binding {
                InputBinding::TaskOutput { task: producer, output } if is_artifact => {
                    inputs.artifacts.insert(
                        name.clone(),
                        ArtifactInput {
                            task_output_artifact: TaskOutputArtifact {
                                output_artifact_key: output.clone(),
                                producer_task: producer.clone(),
                            },
                        },
                    );
                }
                InputBinding::TaskOutput { task: producer, output } => {
                    inputs.parameters.insert(
                        name.clone(),
                        ParameterInput {
                            task_output_parameter: Some(TaskOutputParameter {
                                output_parameter_key: output.clone(),
                                producer_task: producer.clone(),
                            }),
                            ..ParameterInput::default()
                        },
                    );
                }
                InputBinding::Parameter(parameter) => {
                    inputs.parameters.insert(
                        name.clone(),
                        ParameterInput {
                            component_input_parameter: Some(parameter.clone()),
                            ..ParameterInput::default()
                        },
                    );
                }
                InputBinding::Constant(value) => {
                    inputs.parameters.insert(
                        name.clone(),
                        ParameterInput {
                            runtime_value: Some(RuntimeValue {
                                constant: value.clone(),
                            }),
                            ..ParameterInput::default()
                        },
                    );
                }
            }
        }

        let dependent_tasks = task
            .dependencies()
            .into_iter()
            .filter(|dep| graph.task(dep).is_some())
            .collect();

        DagTask {
            caching_options: CachingOptions {
                enable_cache: self.enable_caching,
            },
            component_ref: ComponentRef {
                name: component_key(task),
            },
            dependent_tasks,
            inputs: if inputs.artifacts.is_empty() && inputs.parameters.is_empty() {
                None
            } else {
                Some(inputs)
            },
            task_info: TaskInfo {
                name: task.id.clone(),
            },
        }
    }
}

fn component_key(task: &Task) -> String {
    format!("comp-{}", task.id)
}

fn executor_key(task: &Task) -> String {
    format!("exec-{}", task.id)
}

fn io_definitions(ports: &[PortSpec]) -> Option<IoDefinitions> {
    let mut definitions = IoDefinitions::default();
    for port in ports {
        match port.port_type {
            PortType::String => {
                definitions
                    .parameters
                    .insert(port.name.clone(), ParameterSpec::string(None));
            }
            PortType::Artifact(kind) => {
                definitions.artifacts.insert(
                    port.name.clone(),
                    ArtifactSpec {
                        artifact_type: TypeSchema::new(kind.schema_title()),
                    },
                );
            }
        }
    }
    definitions.non_empty()
}

fn component_spec(task: &Task) -> ComponentSpec {
    ComponentSpec {
        input_definitions: io_definitions(&task.step.inputs),
        output_definitions: io_definitions(&task.step.outputs),
        executor_label: executor_key(task),
    }
}

fn platform_spec(graph: &PipelineGraph) -> Option<PlatformSpec> {
    let executors: BTreeMap<String, KubernetesExecutor> = graph
        .tasks()
        .iter()
        .filter(|t| !t.annotations.is_empty())
        .map(|t| {
            (
                executor_key(t),
                KubernetesExecutor {
                    pod_metadata: PodMetadata {
                        annotations: t.annotations.clone(),
                    },
                },
            )
        })
        .collect();

    if executors.is_empty() {
        return None;
    }

    Some(PlatformSpec {
        platforms: Platforms {
            kubernetes: KubernetesPlatform {
                deployment_spec: KubernetesDeployment { executors },
            },
        },
    })
}

/// Comment block listing the pipeline name and its inputs
fn header(graph: &PipelineGraph) -> String {
    let mut out = String::from("# PIPELINE DEFINITION\n");
    out.push_str(&format!("# Name: {}\n", graph.name));
    if let Some(description) = &graph.description {
        out.push_str(&format!("# Description: {}\n", description));
    }
    if !graph.parameters.is_empty() {
        out.push_str("# Inputs:\n");
        for parameter in &graph.parameters {
            match &parameter.default {
                Some(default) => {
                    out.push_str(&format!("#    {}: str [Default: '{}']\n", parameter.name, default))
                }
                None => out.push_str(&format!("#    {}: str\n", parameter.name)),
            }
        }
    }
    out
}
