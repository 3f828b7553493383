//! Core domain models
//!
//! Steps and their typed ports, the pipeline graph and its builder,
//! definition files, settings, and the state of local runs.

pub mod artifact;
pub mod context;
pub mod definition;
pub mod graph;
pub mod pipeline;
pub mod settings;
pub mod state;
pub mod step;

pub use artifact::*;
pub use context::*;
pub use definition::{DefinitionError, PipelineDefinition, TaskDefinition};
pub use graph::*;
pub use pipeline::*;
pub use settings::Settings;
pub use state::*;
pub use step::*;
