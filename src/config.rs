use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::predictor::PredictorConfig;
use crate::training_load::{AcwrConfig, FfmConfig};
use crate::zones::DEFAULT_MAX_HR;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Athlete profile settings
    pub athlete: AthleteSettings,

    /// Route-time predictor settings
    pub predictor: PredictorConfig,

    /// Fitness-fatigue filter settings
    pub ffm: FfmConfig,

    /// Acute:chronic workload ratio windows
    pub acwr: AcwrConfig,

    /// Logging settings
    pub logging: LogConfig,
}

/// Athlete profile configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteSettings {
    /// Maximum heart rate in bpm, used for zone boundaries
    pub max_hr: f64,
}

impl Default for AthleteSettings {
    fn default() -> Self {
        AthleteSettings {
            max_hr: DEFAULT_MAX_HR,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pacecast")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "unusable config file, using defaults");
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&self) -> Result<()> {
        self.save_to_file(Self::default_config_path())
    }
}
