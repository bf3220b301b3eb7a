//! Configuration loading and management
//!
//! Handles parsing of `config.toml`. Lookup order is an explicit `--config`
//! path, then `<config_dir>/taskdeck/config.toml`, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::persistence::{DEFAULT_LEGACY_KEYS, DEFAULT_PRIMARY_KEY};
use crate::storage::validate_key;
use crate::task::TaskStatus;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Tasks configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<key>.json` files; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Key the collection is saved under
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Older keys read when the primary key holds nothing usable
    #[serde(default = "default_legacy_keys")]
    pub legacy_keys: Vec<String>,

    /// How long a write waits for the file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_legacy_keys() -> Vec<String> {
    DEFAULT_LEGACY_KEYS.iter().map(|key| key.to_string()).collect()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            primary_key: default_primary_key(),
            legacy_keys: default_legacy_keys(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Default status for new tasks
    #[serde(default = "default_task_status")]
    pub default_status: String,
}

fn default_task_status() -> String {
    TaskStatus::Pending.as_str().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_status: default_task_status(),
        }
    }
}

impl TasksConfig {
    /// Parsed default status; validated on load
    pub fn default_status(&self) -> TaskStatus {
        self.default_status.parse().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        self.default_status.parse::<TaskStatus>().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_status '{}' is not one of pending|in_progress|completed",
                self.default_status
            ))
        })?;
        Ok(())
    }
}

impl StorageConfig {
    /// Data directory: configured value, else the platform data dir
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "could not determine a data directory; pass --data-dir".to_string(),
                )
            })
    }

    fn validate(&self) -> Result<()> {
        validate_storage_key(&self.primary_key, "storage.primary_key")?;

        let mut seen = HashSet::new();
        for key in &self.legacy_keys {
            validate_storage_key(key, "storage.legacy_keys")?;
            if key == &self.primary_key {
                return Err(Error::InvalidConfig(format!(
                    "storage.legacy_keys cannot include the primary key '{key}'"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "storage.legacy_keys has duplicate entry '{key}'"
                )));
            }
        }

        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_storage_key(key: &str, field: &str) -> Result<()> {
    validate_key(key).map_err(|err| match err {
        Error::InvalidArgument(message) => Error::InvalidConfig(format!("{field}: {message}")),
        other => other,
    })
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "taskdeck")
}

/// Default location of the configuration file, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit` if given (it must exist), else the default
    /// location when present, else defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}
