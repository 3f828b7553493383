//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CompileCommand, ExecCommand, ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Healthcare ML pipelines: compile to workflows or run locally
#[derive(Debug, Parser, Clone)]
#[command(name = "healthflow")]
#[command(version)]
#[command(about = "Healthcare ML pipeline definitions compiled to orchestrator workflows", long_about = None)]
pub struct Cli {
    /// Without a command, compiles healthcare-pipeline to healthcare_ml_pipeline.yaml
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Compile a pipeline to a workflow file
    Compile(CompileCommand),

    /// Run a pipeline on the local machine
    Run(RunCommand),

    /// Run a single built-in step
    Exec(ExecCommand),

    /// Validate a pipeline definition file
    Validate(ValidateCommand),

    /// List built-in pipelines and steps
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
