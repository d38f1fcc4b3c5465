//! Birdcall configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BirdcallError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdcallConfig {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for BirdcallConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl BirdcallConfig {
    /// Load config from the default path (~/.birdcall/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BirdcallError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| BirdcallError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| BirdcallError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".birdcall")
            .join("config.toml")
    }
}

/// Platform write-API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token for the write API. Empty means posting is unconfigured.
    #[serde(default)]
    pub bearer_token: String,
}

fn default_api_base() -> String {
    "https://api.twitter.com/2".into()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            bearer_token: String::new(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Directory holding the schedule file.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "~/.birdcall/scheduler".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
