//! `healthcare-pipeline`: one task deriving risk scores

use crate::components::{healthcare, BuiltinStep};
use crate::core::{GraphError, PipelineBuilder, PipelineGraph, Task};

pub const NAME: &str = "healthcare-pipeline";
pub const PACKAGE_PATH: &str = "healthcare_ml_pipeline.yaml";

pub const DEFAULT_INPUT_PATH: &str = "/app/data/patients.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "/app/data/processed_data.csv";

pub fn build() -> Result<PipelineGraph, GraphError> {
    let mut builder = PipelineBuilder::new(NAME);
    let input_path = builder.parameter(healthcare::INPUT_PATH, Some(DEFAULT_INPUT_PATH))?;
    let output_path = builder.parameter(healthcare::OUTPUT_PATH, Some(DEFAULT_OUTPUT_PATH))?;

    builder.add_task(
        Task::new("process-healthcare-data", BuiltinStep::ProcessHealthcareData.spec())
            .input(healthcare::INPUT_PATH, input_path)
            .input(healthcare::OUTPUT_PATH, output_path),
    )?;

    builder.build()
}
