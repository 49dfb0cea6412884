use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use emubot_controller::{ControllerConfig, PackageName};
use log::info;
use serde::{Deserialize, Serialize};

/// `[installation]` in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationConfig {
    /// Checked when a retry fires without a pending package
    pub default_package: String,
    pub poll_interval_ms: u64,
    pub action_text: String,
}

impl Default for InstallationConfig {
    fn default() -> Self {
        Self {
            default_package: "com.supercell.clashroyale".to_string(),
            poll_interval_ms: 500,
            action_text: "Retry".to_string(),
        }
    }
}

impl InstallationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn default_package(&self) -> PackageName {
        PackageName::new(self.default_package.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub controller: ControllerConfig,
    pub installation: InstallationConfig,
}

impl AppConfig {
    /// Load from a toml file, falling back to defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, using default config", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(content)?;
        Ok(config)
    }
}
