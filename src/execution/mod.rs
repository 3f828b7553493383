//! Local pipeline execution

pub mod engine;
pub mod executor;
pub mod process;
pub mod scheduler;

pub use engine::{ExecutionEngine, ExecutionEvent};
pub use executor::{LocalExecutor, TaskExecutor, TaskOutputs};
pub use process::ProcessRunner;
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};

use crate::components::StepError;
use crate::core::{ContextError, ParameterError};
use thiserror::Error;

/// Error types for local execution
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("Container command is empty")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    ProcessFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("Task worker stopped unexpectedly: {0}")]
    Join(String),

    #[error("Pipeline '{pipeline}' failed: {}", failed.join(", "))]
    RunFailed {
        pipeline: String,
        failed: Vec<String>,
    },
}
