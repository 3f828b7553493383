//! `healthcare-gcs-pipeline`: the training chain fed from object storage

use super::training::add_training_chain;
use crate::components::download;
use crate::core::{GraphError, PipelineBuilder, PipelineGraph, Settings, Task};

pub const NAME: &str = "healthcare-gcs-pipeline";
pub const PACKAGE_PATH: &str = "healthcare_gcs_pipeline.yaml";

pub const DEFAULT_URI: &str = "gs://healthcare-ml-data/patients.csv";

pub fn build(settings: &Settings) -> Result<PipelineGraph, GraphError> {
    let mut builder = PipelineBuilder::new(NAME)
        .description("Download patient data, then preprocess, train and evaluate");
    let uri = builder.parameter(download::URI_INPUT, Some(DEFAULT_URI))?;

    let step = download::download_step(&settings.storage_image, &settings.storage_copy_command);
    let fetch = builder.add_task(
        Task::new("download-data", step)
            .input(download::URI_INPUT, uri)
            .annotations(&settings.annotations),
    )?;

    add_training_chain(&mut builder, fetch.output(download::DATA_OUTPUT)?, settings)?;
    builder.build()
}
