//! Pipeline definitions loaded from YAML
//!
//! A definition names parameters and tasks; task inputs refer to parameters
//! with `{{ params.NAME }}` and to upstream outputs with
//! `{{ tasks.ID.outputs.NAME }}`. Anything else is a constant.

use crate::components::{download, BuiltinStep};
use crate::core::graph::{GraphError, InputBinding, PipelineBuilder, PipelineGraph, Task};
use crate::core::settings::Settings;
use crate::core::step::Step;
use crate::core::ArtifactKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Step name of the artifact importer
pub const IMPORTER_STEP: &str = "importer";

/// Errors raised while loading or assembling a definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid definition YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Duplicate task ID: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' uses unknown step '{step}'")]
    UnknownStep { task: String, step: String },

    #[error("Task '{task}' depends on non-existent task '{reference}'")]
    UnknownTask { task: String, reference: String },

    #[error("Task '{task}' references undeclared parameter '{parameter}'")]
    UnknownParameter { task: String, parameter: String },

    #[error("Task '{task}' has malformed reference '{value}'")]
    InvalidReference { task: String, value: String },

    #[error("Cycle detected in dependency graph involving task '{0}'")]
    Cycle(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Top-level pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Run-time parameters and their defaults
    #[serde(default)]
    pub parameters: BTreeMap<String, Option<String>>,

    pub tasks: Vec<TaskDefinition>,
}

/// Task as written in a definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Unique task identifier
    pub id: String,

    /// Built-in step name, `importer` or `download_data`
    pub step: String,

    /// Artifact kind produced by an importer task
    #[serde(default)]
    pub artifact_kind: Option<ArtifactKind>,

    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    /// Tasks that must finish first without passing data
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// A parsed input value
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    Parameter(String),
    TaskOutput { task: String, output: String },
    Literal(String),
}

fn parameter_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\{\{\s*params\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}$").expect("valid regex")
    })
}

fn output_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\{\{\s*tasks\.([a-z0-9][-a-z0-9]*)\.outputs\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}$")
            .expect("valid regex")
    })
}

impl TaskDefinition {
    fn reference(&self, value: &str) -> Result<Reference, DefinitionError> {
        if let Some(caps) = parameter_reference().captures(value) {
            return Ok(Reference::Parameter(caps[1].to_string()));
        }
        if let Some(caps) = output_reference().captures(value) {
            return Ok(Reference::TaskOutput {
                task: caps[1].to_string(),
                output: caps[2].to_string(),
            });
        }
        if value.trim_start().starts_with("{{") {
            return Err(DefinitionError::InvalidReference {
                task: self.id.clone(),
                value: value.to_string(),
            });
        }
        Ok(Reference::Literal(value.to_string()))
    }

    /// IDs of every task this one needs finished first
    fn dependencies(&self) -> Result<Vec<String>, DefinitionError> {
        let mut deps = self.depends_on.clone();
        for value in self.inputs.values() {
            if let Reference::TaskOutput { task, .. } = self.reference(value)? {
                if !deps.contains(&task) {
                    deps.push(task);
                }
            }
        }
        Ok(deps)
    }

    fn resolve_step(&self, settings: &Settings) -> Result<Step, DefinitionError> {
        match self.step.as_str() {
            IMPORTER_STEP => Ok(Step::importer(self.artifact_kind.unwrap_or(ArtifactKind::Dataset))),
            download::STEP_NAME => Ok(download::download_step(
                &settings.storage_image,
                &settings.storage_copy_command,
            )),
            name => BuiltinStep::from_name(name)
                .map(|builtin| builtin.spec())
                .ok_or_else(|| DefinitionError::UnknownStep {
                    task: self.id.clone(),
                    step: name.to_string(),
                }),
        }
    }
}

impl PipelineDefinition {
    /// Load a definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, DefinitionError> {
        let definition: PipelineDefinition = serde_yaml::from_str(yaml)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Validate IDs, references and acyclicity
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut seen_ids = HashSet::new();
        for task in &self.tasks {
            if !seen_ids.insert(task.id.as_str()) {
                return Err(DefinitionError::DuplicateTask(task.id.clone()));
            }
        }

        for task in &self.tasks {
            if task.step != IMPORTER_STEP
                && task.step != download::STEP_NAME
                && BuiltinStep::from_name(&task.step).is_none()
            {
                return Err(DefinitionError::UnknownStep {
                    task: task.id.clone(),
                    step: task.step.clone(),
                });
            }

            for value in task.inputs.values() {
                match task.reference(value)? {
                    Reference::Parameter(name) if !self.parameters.contains_key(&name) => {
                        return Err(DefinitionError::UnknownParameter {
                            task: task.id.clone(),
                            parameter: name,
                        });
                    }
                    _ => {}
                }
            }

            for dep in task.dependencies()? {
                if !seen_ids.contains(dep.as_str()) {
                    return Err(DefinitionError::UnknownTask {
                        task: task.id.clone(),
                        reference: dep,
                    });
                }
            }
        }

        self.check_cycles()
    }

    fn check_cycles(&self) -> Result<(), DefinitionError> {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for task in &self.tasks {
            if !visited.contains(&task.id) {
                self.dfs_check(&task.id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check(
        &self,
        task_id: &str,
        visited: &mut HashSet<String>,
        recursion_stack: &mut HashSet<String>,
    ) -> Result<(), DefinitionError> {
        visited.insert(task_id.to_string());
        recursion_stack.insert(task_id.to_string());

        if let Some(task) = self.task(task_id) {
            for dep in task.dependencies()? {
                if recursion_stack.contains(&dep) {
                    return Err(DefinitionError::Cycle(dep));
                }
                if !visited.contains(&dep) {
                    self.dfs_check(&dep, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(task_id);
        Ok(())
    }

    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Task IDs with every task after its dependencies. Ties keep the
    /// order of the file.
    pub fn topological_order(&self) -> Result<Vec<String>, DefinitionError> {
        let deps: HashMap<&str, Vec<String>> = self
            .tasks
            .iter()
            .map(|t| Ok((t.id.as_str(), t.dependencies()?)))
            .collect::<Result<_, DefinitionError>>()?;

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        for task in &self.tasks {
            Self::visit(&task.id, &deps, &mut visited, &mut result);
        }
        Ok(result)
    }

    fn visit(
        task_id: &str,
        deps: &HashMap<&str, Vec<String>>,
        visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) {
        if !visited.insert(task_id.to_string()) {
            return;
        }

        if let Some(task_deps) = deps.get(task_id) {
            for dep in task_deps {
                Self::visit(dep, deps, visited, result);
            }
        }

        result.push(task_id.to_string());
    }

    /// Assemble the definition into a checked graph
    pub fn to_graph(&self, settings: &Settings) -> Result<PipelineGraph, DefinitionError> {
        self.validate()?;

        let mut builder = PipelineBuilder::new(&self.name);
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        for (name, default) in &self.parameters {
            builder.parameter(name, default.as_deref())?;
        }

        for id in self.topological_order()? {
            let Some(definition) = self.task(&id) else {
                continue;
            };
            debug!("Assembling task '{}' ({})", definition.id, definition.step);

            let mut task = Task::new(&definition.id, definition.resolve_step(settings)?)
                .annotations(&definition.annotations);
            for (input, value) in &definition.inputs {
                let binding = match definition.reference(value)? {
                    Reference::Parameter(name) => InputBinding::Parameter(name),
                    Reference::TaskOutput { task, output } => InputBinding::TaskOutput { task, output },
                    Reference::Literal(value) => InputBinding::Constant(value),
                };
                task = task.input(input, binding);
            }
            for dep in &definition.depends_on {
                task = task.after(dep);
            }

            builder.add_task(task)?;
        }

        Ok(builder.build()?)
    }
}
