//! CLI command definitions

use crate::execution::SchedulingStrategy;
use crate::pipelines::PipelineKind;
use clap::Args;
use std::path::PathBuf;

/// Compile a pipeline to a workflow file
#[derive(Debug, Args, Clone, Default)]
pub struct CompileCommand {
    /// Built-in pipeline to compile
    #[arg(short, long, value_enum, conflicts_with = "file")]
    pub pipeline: Option<PipelineKind>,

    /// Path to a pipeline definition YAML file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Where to write the workflow (defaults to the pipeline's file name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run a pipeline on the local machine
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Built-in pipeline to run
    #[arg(short, long, value_enum, conflicts_with = "file")]
    pub pipeline: Option<PipelineKind>,

    /// Path to a pipeline definition YAML file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Parameter overrides (key=value)
    #[arg(long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Sequential)]
    pub strategy: SchedulingStrategyArg,

    /// Concurrency limit for the parallel-limited strategy
    #[arg(long, default_value_t = 4)]
    pub max_parallel: usize,

    /// Directory for run artifacts (overrides settings)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run a single built-in step; the entrypoint of compiled workflows
#[derive(Debug, Args, Clone)]
pub struct ExecCommand {
    /// Step name, e.g. preprocess_data
    pub step: String,

    /// Input values and input artifact paths (name=value)
    #[arg(long = "input", value_parser = parse_key_value)]
    pub inputs: Vec<(String, String)>,

    /// Output artifact paths and files receiving string outputs (name=path)
    #[arg(long = "output", value_parser = parse_key_value)]
    pub outputs: Vec<(String, String)>,

    /// Forest hyperparameters overriding the settings file (name=value)
    #[arg(long = "forest", value_parser = parse_key_value)]
    pub forest: Vec<(String, String)>,
}

/// Validate a pipeline definition file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List built-in pipelines and steps
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl SchedulingStrategyArg {
    pub fn to_strategy(self, max_parallel: usize) -> SchedulingStrategy {
        match self {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(max_parallel.max(1)),
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
