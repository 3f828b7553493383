//! The fixed healthcare pipelines

pub mod gcs;
pub mod healthcare;
pub mod training;

use crate::core::{GraphError, PipelineGraph, Settings};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipelines shipped with the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Single-step risk scoring
    Healthcare,
    /// Preprocess, train and evaluate from a local file
    Training,
    /// Same chain, with the data copied from object storage first
    GcsTraining,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 3] = [
        PipelineKind::Healthcare,
        PipelineKind::Training,
        PipelineKind::GcsTraining,
    ];

    /// Pipeline name as it appears in compiled workflows
    pub fn pipeline_name(&self) -> &'static str {
        match self {
            PipelineKind::Healthcare => healthcare::NAME,
            PipelineKind::Training => training::NAME,
            PipelineKind::GcsTraining => gcs::NAME,
        }
    }

    /// Workflow file written when no output path is given
    pub fn default_package_path(&self) -> &'static str {
        match self {
            PipelineKind::Healthcare => healthcare::PACKAGE_PATH,
            PipelineKind::Training => training::PACKAGE_PATH,
            PipelineKind::GcsTraining => gcs::PACKAGE_PATH,
        }
    }

    /// Assemble the pipeline graph
    pub fn build(&self, settings: &Settings) -> Result<PipelineGraph, GraphError> {
        match self {
            PipelineKind::Healthcare => healthcare::build(),
            PipelineKind::Training => training::build(settings),
            PipelineKind::GcsTraining => gcs::build(settings),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pipeline_name())
    }
}
