//! Pipeline graph and its builder
//!
//! A [`PipelineGraph`] is a plain value: tasks (step invocations) in
//! construction order, each input bound to a pipeline parameter, a constant
//! or an earlier task's output. The [`PipelineBuilder`] checks every binding
//! when the task is added, so a built graph is well typed and acyclic.

use crate::core::artifact::{PortSpec, PortType};
use crate::core::step::Step;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while assembling a graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Invalid name '{0}': use lowercase letters, digits and '-'")]
    InvalidName(String),

    #[error("Invalid parameter name '{0}'")]
    InvalidParameterName(String),

    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    #[error("Duplicate task ID: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' has no input named '{input}'")]
    UnknownInput { task: String, input: String },

    #[error("Task '{task}' leaves input '{input}' unbound")]
    UnboundInput { task: String, input: String },

    #[error("Task '{task}' references unknown parameter '{parameter}'")]
    UnknownParameter { task: String, parameter: String },

    #[error("Task '{task}' references unknown task '{reference}'")]
    UnknownTask { task: String, reference: String },

    #[error("Task '{task}' has no output named '{output}'")]
    UnknownOutput { task: String, output: String },

    #[error("Input '{input}' of task '{task}' expects {expected}, got {found}")]
    TypeMismatch {
        task: String,
        input: String,
        expected: PortType,
        found: PortType,
    },

    #[error("Input '{input}' of task '{task}' requires columns {missing:?} that the upstream output does not provide")]
    MissingColumns {
        task: String,
        input: String,
        missing: Vec<String>,
    },

    #[error("Pipeline '{0}' has no tasks")]
    EmptyPipeline(String),
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

fn parameter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Check a pipeline or task name
pub fn validate_name(name: &str) -> Result<(), GraphError> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(GraphError::InvalidName(name.to_string()))
    }
}

/// Where a task input gets its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputBinding {
    /// A pipeline parameter, resolved when the pipeline is run
    Parameter(String),
    /// A fixed string
    Constant(String),
    /// An output of an earlier task
    TaskOutput { task: String, output: String },
}

/// Reference to a declared pipeline parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRef(String);

impl ParameterRef {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<ParameterRef> for InputBinding {
    fn from(parameter: ParameterRef) -> Self {
        InputBinding::Parameter(parameter.0)
    }
}

impl From<&ParameterRef> for InputBinding {
    fn from(parameter: &ParameterRef) -> Self {
        InputBinding::Parameter(parameter.0.clone())
    }
}

/// Reference to an output of a task already in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    task: String,
    output: String,
}

impl From<OutputRef> for InputBinding {
    fn from(output: OutputRef) -> Self {
        InputBinding::TaskOutput {
            task: output.task,
            output: output.output,
        }
    }
}

/// One invocation of a step inside a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique task identifier
    pub id: String,

    pub step: Step,

    /// Binding for every step input
    pub inputs: BTreeMap<String, InputBinding>,

    /// Scheduling metadata attached to the task's pod
    pub annotations: BTreeMap<String, String>,

    /// Tasks that must finish first without passing data
    pub after: Vec<String>,
}

impl Task {
    pub fn new(id: &str, step: Step) -> Self {
        Self {
            id: id.to_string(),
            step,
            inputs: BTreeMap::new(),
            annotations: BTreeMap::new(),
            after: Vec::new(),
        }
    }

    /// Bind an input
    pub fn input(mut self, name: &str, binding: impl Into<InputBinding>) -> Self {
        self.inputs.insert(name.to_string(), binding.into());
        self
    }

    /// Bind an input to a fixed string
    pub fn constant(self, name: &str, value: &str) -> Self {
        self.input(name, InputBinding::Constant(value.to_string()))
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotations(mut self, annotations: &BTreeMap<String, String>) -> Self {
        self.annotations
            .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Order this task after another one
    pub fn after(mut self, task: &str) -> Self {
        self.after.push(task.to_string());
        self
    }

    /// IDs of the tasks this one depends on, sorted
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: BTreeSet<String> = self.after.iter().cloned().collect();
        for binding in self.inputs.values() {
            if let InputBinding::TaskOutput { task, .. } = binding {
                deps.insert(task.clone());
            }
        }
        deps.into_iter().collect()
    }
}

/// Handle to a task added to a [`PipelineBuilder`]
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: String,
    step: Step,
}

impl TaskHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reference one of the task's outputs
    pub fn output(&self, name: &str) -> Result<OutputRef, GraphError> {
        match self.step.output(name) {
            Some(_) => Ok(OutputRef {
                task: self.id.clone(),
                output: name.to_string(),
            }),
            None => Err(GraphError::UnknownOutput {
                task: self.id.clone(),
                output: name.to_string(),
            }),
        }
    }
}

/// A run-time parameter of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineParameter {
    pub name: String,
    pub default: Option<String>,
}

/// A validated, acyclic pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineGraph {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<PipelineParameter>,
    tasks: Vec<Task>,
}

impl PipelineGraph {
    /// Tasks in construction order, which is a topological order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn parameter(&self, name: &str) -> Option<&PipelineParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn execution_order(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    /// Tasks that directly depend on `id`
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.dependencies().iter().any(|d| d == id))
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Every task that transitively depends on `id`
    pub fn downstream(&self, id: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut pending = vec![id.to_string()];

        while let Some(current) = pending.pop() {
            for dependent in self.dependents(&current) {
                if found.insert(dependent.to_string()) {
                    pending.push(dependent.to_string());
                }
            }
        }

        found
    }
}

/// Assembles a [`PipelineGraph`] one task at a time
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    name: String,
    description: Option<String>,
    parameters: Vec<PipelineParameter>,
    tasks: Vec<Task>,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            parameters: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Declare a pipeline parameter
    pub fn parameter(&mut self, name: &str, default: Option<&str>) -> Result<ParameterRef, GraphError> {
        if !parameter_pattern().is_match(name) {
            return Err(GraphError::InvalidParameterName(name.to_string()));
        }
        if self.parameters.iter().any(|p| p.name == name) {
            return Err(GraphError::DuplicateParameter(name.to_string()));
        }

        self.parameters.push(PipelineParameter {
            name: name.to_string(),
            default: default.map(str::to_string),
        });
        Ok(ParameterRef(name.to_string()))
    }

    /// Add a task after checking all of its bindings
    pub fn add_task(&mut self, task: Task) -> Result<TaskHandle, GraphError> {
        validate_name(&task.id)?;
        if self.tasks.iter().any(|t| t.id == task.id) {
            return Err(GraphError::DuplicateTask(task.id));
        }

        for name in task.inputs.keys() {
            if task.step.input(name).is_none() {
                return Err(GraphError::UnknownInput {
                    task: task.id.clone(),
                    input: name.clone(),
                });
            }
        }

        for port in &task.step.inputs {
            let binding = task.inputs.get(&port.name).ok_or_else(|| GraphError::UnboundInput {
                task: task.id.clone(),
                input: port.name.clone(),
            })?;
            self.check_binding(&task.id, port, binding)?;
        }

        for reference in &task.after {
            if !self.tasks.iter().any(|t| &t.id == reference) {
                return Err(GraphError::UnknownTask {
                    task: task.id.clone(),
                    reference: reference.clone(),
                });
            }
        }

        let handle = TaskHandle {
            id: task.id.clone(),
            step: task.step.clone(),
        };
        self.tasks.push(task);
        Ok(handle)
    }

    fn check_binding(
        &self,
        task_id: &str,
        port: &PortSpec,
        binding: &InputBinding,
    ) -> Result<(), GraphError> {
        let mismatch = |found: PortType| GraphError::TypeMismatch {
            task: task_id.to_string(),
            input: port.name.clone(),
            expected: port.port_type,
            found,
        };

        match binding {
            InputBinding::Parameter(name) => {
                if !self.parameters.iter().any(|p| &p.name == name) {
                    return Err(GraphError::UnknownParameter {
                        task: task_id.to_string(),
                        parameter: name.clone(),
                    });
                }
                if port.port_type != PortType::String {
                    return Err(mismatch(PortType::String));
                }
            }
            InputBinding::Constant(_) => {
                if port.port_type != PortType::String {
                    return Err(mismatch(PortType::String));
                }
            }
            InputBinding::TaskOutput { task, output } => {
                let producer = self.tasks.iter().find(|t| &t.id == task).ok_or_else(|| {
                    GraphError::UnknownTask {
                        task: task_id.to_string(),
                        reference: task.clone(),
                    }
                })?;
                let produced = producer.step.output(output).ok_or_else(|| GraphError::UnknownOutput {
                    task: task.clone(),
                    output: output.clone(),
                })?;

                if produced.port_type != port.port_type {
                    return Err(mismatch(produced.port_type));
                }

                if !port.columns.is_empty() && !produced.columns.is_empty() {
                    let missing: Vec<String> = port
                        .columns
                        .iter()
                        .filter(|c| !produced.columns.contains(c))
                        .cloned()
                        .collect();
                    if !missing.is_empty() {
                        return Err(GraphError::MissingColumns {
                            task: task_id.to_string(),
                            input: port.name.clone(),
                            missing,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Finish the graph
    pub fn build(self) -> Result<PipelineGraph, GraphError> {
        validate_name(&self.name)?;
        if self.tasks.is_empty() {
            return Err(GraphError::EmptyPipeline(self.name));
        }

        Ok(PipelineGraph {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            tasks: self.tasks,
        })
    }
}
