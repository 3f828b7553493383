//! Step functions
//!
//! Each built-in step reads its inputs from files, writes its outputs to
//! files and keeps no state between invocations. The only thing that crosses
//! a step boundary is a path.

pub mod download;
pub mod evaluate;
pub mod forest;
pub mod healthcare;
pub mod metrics;
pub mod preprocess;
pub mod table;
pub mod train;

pub use evaluate::{evaluate_model, EvaluationMetrics};
pub use forest::{ForestParams, RandomForestRegressor};
pub use healthcare::process_healthcare_data;
pub use preprocess::preprocess_data;
pub use table::Table;
pub use train::train_model;

use crate::core::{ArtifactKind, Implementation, PortSpec, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for step execution
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Name of the string output carrying the status message of
/// `process_healthcare_data`
pub const STATUS_OUTPUT: &str = "Output";

/// Steps implemented in-process by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStep {
    ProcessHealthcareData,
    PreprocessData,
    TrainModel,
    EvaluateModel,
}

impl BuiltinStep {
    pub const ALL: [BuiltinStep; 4] = [
        BuiltinStep::ProcessHealthcareData,
        BuiltinStep::PreprocessData,
        BuiltinStep::TrainModel,
        BuiltinStep::EvaluateModel,
    ];

    /// Whether the step reads forest hyperparameters
    pub fn uses_forest(&self) -> bool {
        matches!(self, BuiltinStep::TrainModel)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStep::ProcessHealthcareData => "process_healthcare_data",
            BuiltinStep::PreprocessData => "preprocess_data",
            BuiltinStep::TrainModel => "train_model",
            BuiltinStep::EvaluateModel => "evaluate_model",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.name() == name)
    }

    /// Describe the step's typed inputs and outputs
    pub fn spec(&self) -> Step {
        let (description, inputs, outputs) = match self {
            BuiltinStep::ProcessHealthcareData => (
                "Derive a risk score for every patient record",
                vec![
                    PortSpec::parameter(healthcare::INPUT_PATH),
                    PortSpec::parameter(healthcare::OUTPUT_PATH),
                ],
                vec![PortSpec::parameter(STATUS_OUTPUT)],
            ),
            BuiltinStep::PreprocessData => (
                "One-hot encode gender and scale treatment cost",
                vec![PortSpec::artifact(preprocess::INPUT, ArtifactKind::Dataset)
                    .with_columns(preprocess::REQUIRED_COLUMNS)],
                vec![PortSpec::artifact(preprocess::OUTPUT, ArtifactKind::Dataset)
                    .with_columns(preprocess::PRODUCED_COLUMNS)],
            ),
            BuiltinStep::TrainModel => (
                "Fit a random forest regressor on the processed data",
                vec![PortSpec::artifact(train::INPUT, ArtifactKind::Dataset)
                    .with_columns(&train::MODEL_COLUMNS)],
                vec![PortSpec::artifact(train::OUTPUT, ArtifactKind::Model)],
            ),
            BuiltinStep::EvaluateModel => (
                "Score a fitted model against the processed data",
                vec![
                    PortSpec::artifact(evaluate::MODEL_INPUT, ArtifactKind::Model),
                    PortSpec::artifact(evaluate::DATA_INPUT, ArtifactKind::Dataset)
                        .with_columns(&train::MODEL_COLUMNS),
                ],
                vec![PortSpec::artifact(evaluate::OUTPUT, ArtifactKind::Metrics)],
            ),
        };

        Step {
            name: self.name().to_string(),
            description: Some(description.to_string()),
            inputs,
            outputs,
            implementation: Implementation::Builtin(*self),
        }
    }

    /// Run the step with resolved input values and output paths.
    ///
    /// Returns the values of the step's string outputs.
    pub fn run(
        &self,
        invocation: &Invocation,
        forest: &ForestParams,
    ) -> Result<BTreeMap<String, String>, StepError> {
        let mut values = BTreeMap::new();

        match self {
            BuiltinStep::ProcessHealthcareData => {
                let message = process_healthcare_data(
                    Path::new(invocation.input(healthcare::INPUT_PATH)?),
                    Path::new(invocation.input(healthcare::OUTPUT_PATH)?),
                )?;
                values.insert(STATUS_OUTPUT.to_string(), message);
            }
            BuiltinStep::PreprocessData => {
                preprocess_data(
                    Path::new(invocation.input(preprocess::INPUT)?),
                    invocation.output(preprocess::OUTPUT)?,
                )?;
            }
            BuiltinStep::TrainModel => {
                train_model(
                    Path::new(invocation.input(train::INPUT)?),
                    invocation.output(train::OUTPUT)?,
                    forest,
                )?;
            }
            BuiltinStep::EvaluateModel => {
                evaluate_model(
                    Path::new(invocation.input(evaluate::MODEL_INPUT)?),
                    Path::new(invocation.input(evaluate::DATA_INPUT)?),
                    invocation.output(evaluate::OUTPUT)?,
                )?;
            }
        }

        Ok(values)
    }
}

impl std::fmt::Display for BuiltinStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved arguments for one step run.
///
/// `inputs` holds parameter values and input artifact paths; `outputs` holds
/// the paths output artifacts must be written to.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, PathBuf>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_output(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.outputs.insert(name.to_string(), path.into());
        self
    }

    pub fn input(&self, name: &str) -> Result<&str, StepError> {
        self.inputs
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StepError::MissingArgument(name.to_string()))
    }

    pub fn output(&self, name: &str) -> Result<&Path, StepError> {
        self.outputs
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| StepError::MissingArgument(name.to_string()))
    }
}

/// Create the parent directory of an output file
pub fn ensure_parent(path: &Path) -> Result<(), StepError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
