use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::run_spec::RuntimeConfig;

pub const DEFAULT_IMAGE: &str = "vogon";

/// Global vogon settings stored in ~/.vogon.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Image used when `--image` is not given
    #[serde(default = "default_image")]
    pub default_image: String,

    /// Extra published ports (host -> container)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<u16, u16>,

    /// Extra volume binds (host path -> container path)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, String>,

    /// Extra environment variables (name -> literal value or host variable name)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_image: default_image(),
            ports: BTreeMap::new(),
            volumes: BTreeMap::new(),
            envs: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, creating a default file if it does not exist.
    /// An existing file is never rewritten.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.write_new(path)?;
            tracing::info!("Created default settings at {}", path.display());
            return Ok(settings);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        let settings: Settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Runtime configuration applied to every container started with these settings.
    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            ports: self.ports.clone(),
            volumes: self.volumes.clone(),
            envs: self.envs.clone(),
        }
    }

    fn write_new(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;

        Ok(())
    }
}
