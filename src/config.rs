use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_temperature_points")]
    pub temperature_points: usize,
    #[serde(default = "default_load_points")]
    pub load_points: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_dir")]
    pub dir: String,
    /// false: history is session-scoped, the slots are deleted on a clean
    /// shutdown and only survive a crash. true: slots persist across runs.
    #[serde(default)]
    pub keep_history_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            history: HistoryConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            temperature_points: default_temperature_points(),
            load_points: default_load_points(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            dir: default_persistence_dir(),
            keep_history_on_exit: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.history.temperature_points < 1 {
            return Err(ConfigError::Validation(
                "history.temperature_points must be >= 1".to_string(),
            ));
        }
        if self.history.load_points < 1 {
            return Err(ConfigError::Validation(
                "history.load_points must be >= 1".to_string(),
            ));
        }
        if self.persistence.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "persistence.dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const fn default_interval_secs() -> u64 {
    2
}

const fn default_temperature_points() -> usize {
    30
}

const fn default_load_points() -> usize {
    20
}

fn default_persistence_dir() -> String {
    "./hwmond-data".to_string()
}
