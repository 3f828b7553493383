//! Download step: copy a dataset out of cloud object storage
//!
//! Unlike the built-in steps this one is a plain container command. The
//! copy utility writes the file to the output artifact's path, and
//! downstream steps pick the file up from there.

use crate::core::{ArtifactKind, ContainerArg, ContainerSpec, Implementation, PortSpec, Step};

pub const STEP_NAME: &str = "download_data";
pub const URI_INPUT: &str = "gcs_uri";
pub const DATA_OUTPUT: &str = "data";

pub const DEFAULT_IMAGE: &str = "google/cloud-sdk:slim";

/// Default copy command, invoked as `<command> <uri> <output path>`
pub fn default_copy_command() -> Vec<String> {
    vec!["gsutil".to_string(), "cp".to_string()]
}

/// Describe the download step for a given image and copy command
pub fn download_step(image: &str, copy_command: &[String]) -> Step {
    Step {
        name: STEP_NAME.to_string(),
        description: Some("Copy a dataset from cloud object storage".to_string()),
        inputs: vec![PortSpec::parameter(URI_INPUT)],
        outputs: vec![PortSpec::artifact(DATA_OUTPUT, ArtifactKind::Dataset)],
        implementation: Implementation::Container(ContainerSpec {
            image: image.to_string(),
            command: copy_command.to_vec(),
            args: vec![
                ContainerArg::InputValue(URI_INPUT.to_string()),
                ContainerArg::OutputPath(DATA_OUTPUT.to_string()),
            ],
        }),
    }
}
