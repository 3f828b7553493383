//! Runtime settings passed explicitly to pipeline assembly and execution

use crate::components::{download, ForestParams};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory
pub const LOCAL_SETTINGS_FILE: &str = "healthflow.yaml";

/// Settings shared by every pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Image that runs the built-in steps
    pub image: String,

    /// Executable inside `image` that provides the `exec` subcommand
    pub executable: String,

    /// Image that runs the storage copy utility
    pub storage_image: String,

    /// Copy command, invoked as `<command> <uri> <destination>`
    pub storage_copy_command: Vec<String>,

    /// Annotations requesting observability features, attached to every
    /// task of the training pipelines
    pub annotations: BTreeMap<String, String>,

    /// Let the orchestrator reuse cached task results
    pub enable_caching: bool,

    /// Forest hyperparameters for the training step
    pub forest: ForestParams,

    /// Directory for local run artifacts
    pub work_dir: PathBuf,

    /// Timeout for container steps run locally
    pub container_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert("prometheus.io/scrape".to_string(), "true".to_string());
        annotations.insert("sidecar.istio.io/inject".to_string(), "false".to_string());

        Self {
            image: "healthflow:latest".to_string(),
            executable: "healthflow".to_string(),
            storage_image: download::DEFAULT_IMAGE.to_string(),
            storage_copy_command: download::default_copy_command(),
            annotations,
            enable_caching: true,
            forest: ForestParams::default(),
            work_dir: PathBuf::from(".healthflow/runs"),
            container_timeout_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Parse settings from YAML; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            anyhow::bail!("image must not be empty");
        }
        if self.executable.trim().is_empty() {
            anyhow::bail!("executable must not be empty");
        }
        if self.storage_copy_command.is_empty() {
            anyhow::bail!("storage_copy_command must name a program");
        }
        Ok(())
    }

    /// Resolve settings: an explicit file, then `./healthflow.yaml`, then
    /// `<config dir>/healthflow/config.yaml`, then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidates = [
            Some(PathBuf::from(LOCAL_SETTINGS_FILE)),
            dirs::config_dir().map(|dir| dir.join("healthflow").join("config.yaml")),
        ];

        for candidate in candidates.into_iter().flatten() {
            if candidate.exists() {
                debug!("Loading settings from {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }
}
