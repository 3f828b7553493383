//! Typed step ports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of file an artifact port carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// CSV table
    Dataset,
    /// Serialized regressor
    Model,
    /// JSON metrics record
    Metrics,
}

impl ArtifactKind {
    /// Artifact type name understood by the orchestration platform
    pub fn schema_title(&self) -> &'static str {
        match self {
            ArtifactKind::Dataset => "system.Dataset",
            ArtifactKind::Model => "system.Model",
            ArtifactKind::Metrics => "system.Metrics",
        }
    }

    /// File extension used for local artifact paths
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Dataset => "csv",
            ArtifactKind::Model | ArtifactKind::Metrics => "json",
        }
    }
}

/// Type of a step input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// Plain string value passed by the orchestrator
    String,
    /// File handed over by path
    Artifact(ArtifactKind),
}

impl PortType {
    pub fn is_artifact(&self) -> bool {
        matches!(self, PortType::Artifact(_))
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::String => f.write_str("string"),
            PortType::Artifact(kind) => f.write_str(kind.schema_title()),
        }
    }
}

/// A named, typed input or output of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,

    pub port_type: PortType,

    /// Table columns. On an input these are the columns the step needs, on
    /// an output the columns it guarantees. Empty means unspecified.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl PortSpec {
    /// A string parameter port
    pub fn parameter(name: &str) -> Self {
        Self {
            name: name.to_string(),
            port_type: PortType::String,
            columns: Vec::new(),
        }
    }

    /// An artifact port
    pub fn artifact(name: &str, kind: ArtifactKind) -> Self {
        Self {
            name: name.to_string(),
            port_type: PortType::Artifact(kind),
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}
