//! healthflow - healthcare ML pipelines compiled to orchestrator workflows

pub mod cli;
pub mod compiler;
pub mod components;
pub mod core;
pub mod execution;
pub mod pipelines;

// Re-export commonly used types
pub use compiler::{CompileError, Compiler};
pub use components::{BuiltinStep, ForestParams, Invocation, StepError};
pub use crate::core::{
    ExecutionStatus, PipelineBuilder, PipelineDefinition, PipelineGraph, PipelineRun, Settings, Step, Task,
    TaskState,
};
pub use execution::{ExecutionEngine, ExecutionError, ExecutionEvent, LocalExecutor, SchedulingStrategy};
pub use pipelines::PipelineKind;
