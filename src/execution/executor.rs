//! Task executor - carries out a single task on the local machine

use crate::{
    components::{ensure_parent, ForestParams, Invocation},
    core::{ContainerArg, ContainerSpec, Implementation, Task, IMPORTER_OUTPUT, IMPORTER_URI_INPUT},
    execution::{ExecutionError, ProcessRunner},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outputs of a finished task: output name to value or artifact path
pub type TaskOutputs = BTreeMap<String, String>;

/// Trait for task execution - allows for different implementations
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run `task` with its inputs resolved and its artifact outputs
    /// allocated in `invocation`
    async fn execute(&self, task: &Task, invocation: Invocation) -> Result<TaskOutputs, ExecutionError>;
}

/// Runs built-in steps in-process and container steps as subprocesses
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    forest: ForestParams,
    runner: ProcessRunner,
}

impl LocalExecutor {
    pub fn new(forest: ForestParams, container_timeout_secs: u64) -> Self {
        Self {
            forest,
            runner: ProcessRunner::new(container_timeout_secs),
        }
    }

    /// Command line of a container step with every placeholder replaced
    pub fn resolve_command(
        container: &ContainerSpec,
        invocation: &Invocation,
    ) -> Result<Vec<String>, ExecutionError> {
        let mut command = container.command.clone();
        for arg in &container.args {
            let value = match arg {
                ContainerArg::Literal(value) => value.clone(),
                ContainerArg::InputValue(name) => invocation.input(name)?.to_string(),
                ContainerArg::OutputPath(name) => {
                    let path = invocation.output(name)?;
                    ensure_parent(path)?;
                    path.display().to_string()
                }
            };
            command.push(value);
        }
        Ok(command)
    }
}

/// Artifact paths of an invocation as output values
fn artifact_outputs(invocation: &Invocation) -> TaskOutputs {
    invocation
        .outputs
        .iter()
        .map(|(name, path)| (name.clone(), path.display().to_string()))
        .collect()
}

#[async_trait]
impl TaskExecutor for LocalExecutor {
    async fn execute(&self, task: &Task, invocation: Invocation) -> Result<TaskOutputs, ExecutionError> {
        info!("Executing task: {} ({})", task.id, task.step.name);

        match &task.step.implementation {
            Implementation::Builtin(builtin) => {
                let builtin = *builtin;
                let forest = self.forest.clone();
                let mut outputs = artifact_outputs(&invocation);

                let values = tokio::task::spawn_blocking(move || builtin.run(&invocation, &forest))
                    .await
                    .map_err(|e| ExecutionError::Join(e.to_string()))??;

                outputs.extend(values);
                Ok(outputs)
            }
            Implementation::Container(container) => {
                let command = Self::resolve_command(container, &invocation)?;
                debug!("Task {} command: {:?}", task.id, command);
                self.runner.run(&command).await?;
                Ok(artifact_outputs(&invocation))
            }
            Implementation::Importer(_) => {
                let uri = invocation.input(IMPORTER_URI_INPUT)?;
                debug!("Task {} imports {}", task.id, uri);
                let mut outputs = TaskOutputs::new();
                outputs.insert(IMPORTER_OUTPUT.to_string(), uri.to_string());
                Ok(outputs)
            }
        }
    }
}
