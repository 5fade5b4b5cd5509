// Configuration module for application settings
// Loads config.toml under the platform config directory, writing defaults on first run

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::services::{BounceTiming, RotationOptions};
use crate::error::PoserError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub enable_colors: bool,
    pub enable_emoji: bool,
    /// Adapter display name used when `--adapter` is not given
    pub default_adapter: Option<String>,
    /// Rotation interval in minutes, kept as text like the rotate flag
    pub rotation_interval: String,
    pub auto_apply: bool,
    pub disable_settle_ms: u64,
    pub enable_settle_ms: u64,
    pub agent_timeout_secs: u64,
    pub powershell_path: String,
    /// Wrapper such as `gsudo` used for mutating agent calls
    pub elevation_command: Option<String>,
    pub profile_store_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_colors: true,
            enable_emoji: true,
            default_adapter: None,
            rotation_interval: crate::DEFAULT_ROTATION_MINUTES.to_string(),
            auto_apply: true,
            disable_settle_ms: crate::DEFAULT_DISABLE_SETTLE_MS,
            enable_settle_ms: crate::DEFAULT_ENABLE_SETTLE_MS,
            agent_timeout_secs: 120,
            powershell_path: "powershell.exe".to_string(),
            elevation_command: None,
            profile_store_path: Self::get_config_dir().join("poser.json"),
        }
    }
}

impl AppConfig {
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::get_config_path())
    }

    /// Read the file at `path`, writing defaults there first when it is missing.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| PoserError::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| PoserError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let default_config = Self::default();
            default_config.save_to(path)?;
            Ok(default_config)
        }
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PoserError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PoserError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| PoserError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join("config.toml")
    }

    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("poser")
    }

    pub fn bounce_timing(&self) -> BounceTiming {
        BounceTiming {
            disable_settle: Duration::from_millis(self.disable_settle_ms),
            enable_settle: Duration::from_millis(self.enable_settle_ms),
        }
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs.max(1))
    }

    pub fn rotation_options(&self) -> RotationOptions {
        RotationOptions {
            auto_apply: self.auto_apply,
            interval: self.rotation_interval.clone(),
        }
    }
}
