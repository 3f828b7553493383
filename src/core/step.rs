//! Step domain model

use crate::components::BuiltinStep;
use crate::core::artifact::{ArtifactKind, PortSpec};

/// Input name of the importer step
pub const IMPORTER_URI_INPUT: &str = "uri";
/// Output name of the importer step
pub const IMPORTER_OUTPUT: &str = "artifact";

/// Contract of a step: named typed inputs to named typed outputs, plus how
/// the step is carried out
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Step name (snake_case)
    pub name: String,

    /// Optional human-readable description
    pub description: Option<String>,

    /// Declared inputs, in order
    pub inputs: Vec<PortSpec>,

    /// Declared outputs, in order
    pub outputs: Vec<PortSpec>,

    pub implementation: Implementation,
}

/// How a step runs
#[derive(Debug, Clone, PartialEq)]
pub enum Implementation {
    /// One of the step functions in this crate
    Builtin(BuiltinStep),
    /// Arbitrary command inside a container image
    Container(ContainerSpec),
    /// Registers an existing URI as an artifact without running anything
    Importer(ArtifactKind),
}

/// Command line of a container step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<ContainerArg>,
}

/// Argument of a container command, resolved at execution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerArg {
    Literal(String),
    /// Value of a string input, or path of an input artifact
    InputValue(String),
    /// Path the named output artifact must be written to
    OutputPath(String),
}

impl Step {
    /// Step that turns a URI parameter into an artifact of the given kind
    pub fn importer(kind: ArtifactKind) -> Self {
        Step {
            name: "importer".to_string(),
            description: Some(format!("Import an existing {}", kind.schema_title())),
            inputs: vec![PortSpec::parameter(IMPORTER_URI_INPUT)],
            outputs: vec![PortSpec::artifact(IMPORTER_OUTPUT, kind)],
            implementation: Implementation::Importer(kind),
        }
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Component name used in compiled workflows (kebab-case)
    pub fn component_name(&self) -> String {
        self.name.replace('_', "-")
    }
}
