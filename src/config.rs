//! Layered configuration for Cadence.
//!
//! Loaded from `--config`, `.cadence.yml` or `~/.config/cadence/cadence.yml`,
//! falling back to defaults. Every section and field is optional.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::TransitionConfig;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides RUST_LOG when set
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    pub storage: StorageConfig,

    /// Transition engine knobs
    pub algorithm: TransitionConfig,

    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `schedules/` and `index.json`.
    #[serde(rename = "base-dir")]
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let default_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadence");

        Self { base_dir: default_dir }
    }
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .cadence.yml in current directory
    /// 3. ~/.config/cadence/cadence.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(".cadence.yml");
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from .cadence.yml");
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load .cadence.yml: {}", e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cadence").join("cadence.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Scheduler settings with the algorithm section folded in.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        self.scheduler.clone().with_transition(self.algorithm.clone())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.algorithm.validate().context("Invalid algorithm section")?;

        if self.scheduler.batch_size == 0 {
            eyre::bail!("scheduler.batch-size must be > 0");
        }
        if self.scheduler.seconds_per_review == 0 {
            eyre::bail!("scheduler.seconds-per-review must be > 0");
        }
        if self.scheduler.forecast_days == 0 {
            eyre::bail!("scheduler.forecast-days must be > 0");
        }
        Ok(())
    }
}
