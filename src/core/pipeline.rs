//! A single local run of a pipeline graph

use crate::core::{
    context::RunContext,
    graph::{PipelineGraph, Task},
    state::{ExecutionStatus, RunState, TaskState},
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("Unknown parameter: {0}")]
    Unknown(String),

    #[error("Parameter '{0}' has no default and was not provided")]
    Missing(String),
}

/// A graph together with the state of one run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub graph: PipelineGraph,

    /// Resolved parameter values
    pub parameters: BTreeMap<String, String>,

    /// Per-task state, keyed by task ID
    task_states: BTreeMap<String, TaskState>,

    pub state: RunState,

    /// Directory holding this run's artifacts
    pub run_dir: PathBuf,
}

impl PipelineRun {
    /// Prepare a run. Overrides replace parameter defaults; every parameter
    /// must end up with a value.
    pub fn new(
        graph: PipelineGraph,
        overrides: &BTreeMap<String, String>,
        work_dir: &Path,
    ) -> Result<Self, ParameterError> {
        for name in overrides.keys() {
            if graph.parameter(name).is_none() {
                return Err(ParameterError::Unknown(name.clone()));
            }
        }

        let mut parameters = BTreeMap::new();
        for parameter in &graph.parameters {
            let value = overrides
                .get(&parameter.name)
                .or(parameter.default.as_ref())
                .ok_or_else(|| ParameterError::Missing(parameter.name.clone()))?;
            parameters.insert(parameter.name.clone(), value.clone());
        }

        let task_states = graph
            .tasks()
            .iter()
            .map(|t| (t.id.clone(), TaskState::Pending))
            .collect();

        let state = RunState::new();
        let run_dir = work_dir.join(state.run_id.to_string());

        Ok(Self {
            graph,
            parameters,
            task_states,
            state,
            run_dir,
        })
    }

    pub fn task_state(&self, id: &str) -> Option<&TaskState> {
        self.task_states.get(id)
    }

    pub fn task_states(&self) -> &BTreeMap<String, TaskState> {
        &self.task_states
    }

    pub fn set_task_state(&mut self, id: &str, state: TaskState) {
        match &state {
            TaskState::Completed { .. } => self.state.completed_tasks += 1,
            TaskState::Failed { .. } => self.state.failed_tasks += 1,
            TaskState::Skipped { .. } => self.state.skipped_tasks += 1,
            TaskState::Pending | TaskState::Running { .. } => {}
        }
        self.task_states.insert(id.to_string(), state);
    }

    /// Tasks whose dependencies have all completed, in graph order
    pub fn ready_tasks(&self) -> Vec<&Task> {
        self.graph
            .tasks()
            .iter()
            .filter(|t| matches!(self.task_states.get(&t.id), Some(TaskState::Pending)))
            .filter(|t| {
                t.dependencies()
                    .iter()
                    .all(|dep| self.task_states.get(dep).is_some_and(TaskState::is_completed))
            })
            .collect()
    }

    pub fn running_tasks(&self) -> Vec<&Task> {
        self.graph
            .tasks()
            .iter()
            .filter(|t| matches!(self.task_states.get(&t.id), Some(TaskState::Running { .. })))
            .collect()
    }

    /// Check if every task reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.task_states.values().all(TaskState::is_terminal)
    }

    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Mark every pending task downstream of `failed` as skipped
    pub fn skip_downstream(&mut self, failed: &str) -> Vec<String> {
        let mut skipped = Vec::new();
        for id in self.graph.downstream(failed) {
            if matches!(self.task_states.get(&id), Some(TaskState::Pending)) {
                self.set_task_state(
                    &id,
                    TaskState::Skipped {
                        reason: format!("upstream task '{}' failed", failed),
                    },
                );
                skipped.push(id);
            }
        }
        skipped
    }

    /// Outputs of a completed task
    pub fn outputs(&self, id: &str) -> Option<&BTreeMap<String, String>> {
        match self.task_states.get(id) {
            Some(TaskState::Completed { outputs, .. }) => Some(outputs),
            _ => None,
        }
    }

    /// Build the context tasks resolve their inputs against
    pub fn create_context(&self) -> RunContext {
        let mut context = RunContext::new(self.run_dir.clone());

        for (name, value) in &self.parameters {
            context.set_parameter(name, value);
        }

        for (id, state) in &self.task_states {
            if let TaskState::Completed { outputs, .. } = state {
                context.set_task_outputs(id, outputs.clone());
            }
        }

        context
    }
}
