use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use cfg_if::cfg_if;
use serde::{Deserialize, Serialize};

use crate::{Controller, ControllerError, Result};

/// The emulator products a controller can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Any emulator reachable through `adb`
    #[default]
    Adb,
    Memu,
    Bluestacks,
    GooglePlay,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendKind::Adb => "adb",
            BackendKind::Memu => "memu",
            BackendKind::Bluestacks => "bluestacks",
            BackendKind::GooglePlay => "google-play",
        };
        f.write_str(s)
    }
}

impl FromStr for BackendKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adb" => Ok(BackendKind::Adb),
            "memu" => Ok(BackendKind::Memu),
            "bluestacks" => Ok(BackendKind::Bluestacks),
            "google-play" | "google_play" => Ok(BackendKind::GooglePlay),
            other => Err(ControllerError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Settings shared by every backend, `[controller]` in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub backend: BackendKind,
    /// adb serial of the instance, e.g. `127.0.0.1:16384`
    pub serial: String,
    pub adb_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub density: u32,
    /// Upper bound for a single backend command
    pub command_timeout_ms: u64,
    pub boot_timeout_ms: u64,
    pub swipe_duration_ms: u64,
    /// Stop the instance when the controller is released
    pub auto_stop: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Adb,
            serial: "127.0.0.1:16384".to_string(),
            adb_path: PathBuf::from("adb"),
            width: 419,
            height: 633,
            density: 160,
            command_timeout_ms: 10_000,
            boot_timeout_ms: 120_000,
            swipe_duration_ms: 300,
            auto_stop: true,
        }
    }
}

impl ControllerConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_millis(self.boot_timeout_ms)
    }

    pub fn swipe_duration(&self) -> Duration {
        Duration::from_millis(self.swipe_duration_ms)
    }
}

cfg_if! {
    if #[cfg(feature = "android")] {
        fn build_adb_controller(config: &ControllerConfig) -> Result<Box<dyn Controller>> {
            Ok(Box::new(crate::android::AdbController::new(config.clone())))
        }
    } else {
        fn build_adb_controller(_config: &ControllerConfig) -> Result<Box<dyn Controller>> {
            Err(ControllerError::UnsupportedBackend(
                "adb (built without the `android` feature)".to_string(),
            ))
        }
    }
}

/// Build the backend named by `config.backend`.
///
/// The controller is returned `Uncreated`; drive it through
/// [`Controller::create`] and [`Controller::start`] before use.
pub fn build_controller(config: &ControllerConfig) -> Result<Box<dyn Controller>> {
    match config.backend {
        BackendKind::Adb => build_adb_controller(config),
        other => Err(ControllerError::UnsupportedBackend(other.to_string())),
    }
}
