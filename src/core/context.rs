//! Run context - parameter values and upstream outputs

use crate::components::Invocation;
use crate::core::artifact::PortType;
use crate::core::graph::{InputBinding, Task};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Parameter '{0}' has no value")]
    UnsetParameter(String),

    #[error("Output '{output}' of task '{task}' is not available")]
    MissingOutput { task: String, output: String },
}

/// Everything a task needs to resolve its inputs during a local run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Resolved pipeline parameters
    pub parameters: BTreeMap<String, String>,

    /// Outputs of completed tasks (task_id -> output name -> value or path)
    pub task_outputs: BTreeMap<String, BTreeMap<String, String>>,

    /// Directory holding this run's artifacts
    pub run_dir: PathBuf,
}

impl RunContext {
    pub fn new(run_dir: PathBuf) -> Self {
        Self {
            parameters: BTreeMap::new(),
            task_outputs: BTreeMap::new(),
            run_dir,
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: &str) {
        self.parameters.insert(name.to_string(), value.to_string());
    }

    /// Record the outputs of a completed task
    pub fn set_task_outputs(&mut self, task_id: &str, outputs: BTreeMap<String, String>) {
        self.task_outputs.insert(task_id.to_string(), outputs);
    }

    pub fn get_task_output(&self, task_id: &str, output: &str) -> Option<&String> {
        self.task_outputs.get(task_id).and_then(|o| o.get(output))
    }

    /// Value of a single binding
    pub fn resolve(&self, binding: &InputBinding) -> Result<String, ContextError> {
        match binding {
            InputBinding::Parameter(name) => self
                .parameters
                .get(name)
                .cloned()
                .ok_or_else(|| ContextError::UnsetParameter(name.clone())),
            InputBinding::Constant(value) => Ok(value.clone()),
            InputBinding::TaskOutput { task, output } => self
                .get_task_output(task, output)
                .cloned()
                .ok_or_else(|| ContextError::MissingOutput {
                    task: task.clone(),
                    output: output.clone(),
                }),
        }
    }

    /// Where an artifact output of a task lives: `<run_dir>/<task_id>/<output>.<ext>`
    pub fn artifact_path(&self, task: &Task, output: &str) -> Option<PathBuf> {
        let port = task.step.output(output)?;
        match port.port_type {
            PortType::Artifact(kind) => Some(
                self.run_dir
                    .join(&task.id)
                    .join(format!("{}.{}", output, kind.extension())),
            ),
            PortType::String => None,
        }
    }

    /// Resolve every input of a task and allocate its artifact outputs
    pub fn invocation(&self, task: &Task) -> Result<Invocation, ContextError> {
        let mut invocation = Invocation::new();

        for port in &task.step.inputs {
            if let Some(binding) = task.inputs.get(&port.name) {
                invocation = invocation.with_input(&port.name, self.resolve(binding)?);
            }
        }

        for port in &task.step.outputs {
            if let Some(path) = self.artifact_path(task, &port.name) {
                invocation = invocation.with_output(&port.name, path);
            }
        }

        Ok(invocation)
    }
}
