//! Settings loaded from `config.toml` in the data directory
//!
//! Missing files and missing keys fall back to defaults, so an empty data
//! directory is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tuning for the review scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Recall probability the review interval is aimed at
    pub desired_retention: f64,
    /// Interval (days) for a `Good` rating while a card is still learning
    pub learning_step_days: f64,
    /// A learning card graduates once its review count exceeds this
    pub graduation_reps: u32,
    /// Interval after an `Again` rating
    pub relearning_minutes: f64,
    pub maximum_interval_days: f64,
    /// Extra stability growth multiplier for `Easy`
    pub easy_bonus: f64,
    /// Reduced stability growth multiplier for `Hard`
    pub hard_penalty: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            desired_retention: 0.9,
            learning_step_days: 1.0,
            graduation_reps: 2,
            relearning_minutes: 10.0,
            maximum_interval_days: 36_500.0,
            easy_bonus: 1.8,
            hard_penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KataConfig {
    pub scheduler: SchedulerConfig,
    /// JSON manifest describing exercises, lessons and modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_index: Option<PathBuf>,
}

/// Get the default data directory
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join("kata"))
        .ok_or(ConfigError::DataDirNotFound)
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load settings, returning defaults when no config file exists
pub fn load_config(data_dir: &Path) -> Result<KataConfig> {
    let path = config_path(data_dir);
    if !path.exists() {
        return Ok(KataConfig::default());
    }

    let content = fs::read_to_string(&path)?;
    let config: KataConfig = toml::from_str(&content)?;
    Ok(config)
}

pub fn save_config(data_dir: &Path, config: &KataConfig) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let content = toml::to_string_pretty(config)?;
    fs::write(config_path(data_dir), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, KataConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            config_path(temp.path()),
            "[scheduler]\ndesired_retention = 0.85\n",
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.scheduler.desired_retention, 0.85);
        assert_eq!(config.scheduler.graduation_reps, 2);
        assert!(config.content_index.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let mut config = KataConfig::default();
        config.content_index = Some(PathBuf::from("/tmp/course.json"));
        config.scheduler.relearning_minutes = 30.0;

        save_config(temp.path(), &config).unwrap();
        assert_eq!(load_config(temp.path()).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(config_path(temp.path()), "scheduler = 3").unwrap();
        assert!(matches!(load_config(temp.path()), Err(ConfigError::Parse(_))));
    }
}
