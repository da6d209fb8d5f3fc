//! Runtime configuration for the contract store.
//!
//! Resolution order: an explicit `--config` file, then `./archiflow.toml`,
//! then built-in defaults. Environment overrides are applied last.

use crate::core::error::ArchiflowError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "archiflow.toml";

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiflowConfig {
    /// Database file. `None` means the per-user data directory.
    pub database_path: Option<PathBuf>,
    pub cache_enabled: bool,
    /// Maximum cached contracts; `None` keeps every entry.
    pub cache_capacity: Option<usize>,
    pub busy_timeout_secs: u64,
    pub journal_mode: String,
    pub expiring_threshold_days: i64,
    pub log_filter: String,
}

impl Default for ArchiflowConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            cache_enabled: true,
            cache_capacity: None,
            busy_timeout_secs: 5,
            journal_mode: "WAL".to_string(),
            expiring_threshold_days: 30,
            log_filter: "info".to_string(),
        }
    }
}

impl ArchiflowConfig {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ArchiflowError> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ArchiflowError::ConfigError(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.exists() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ArchiflowError> {
        let content = fs::read_to_string(path).map_err(ArchiflowError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ArchiflowError> {
        let config: ArchiflowConfig =
            toml::from_str(content).map_err(|e| ArchiflowError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `ARCHIFLOW_DB` sets the database path, `ARCHIFLOW_CACHE` toggles the cache.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ArchiflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("ARCHIFLOW_DB").filter(|v| !v.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(cache) = lookup("ARCHIFLOW_CACHE") {
            self.cache_enabled = match cache.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                other => {
                    return Err(ArchiflowError::ConfigError(format!(
                        "ARCHIFLOW_CACHE must be a boolean, got '{}'",
                        other
                    )));
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ArchiflowError> {
        let mode = self.journal_mode.to_ascii_uppercase();
        if !JOURNAL_MODES.contains(&mode.as_str()) {
            return Err(ArchiflowError::ConfigError(format!(
                "unsupported journal_mode '{}' (expected one of {})",
                self.journal_mode,
                JOURNAL_MODES.join(", ")
            )));
        }
        if self.cache_capacity == Some(0) {
            return Err(ArchiflowError::ConfigError(
                "cache_capacity must be at least 1 when set".to_string(),
            ));
        }
        if self.expiring_threshold_days < 0 {
            return Err(ArchiflowError::ConfigError(
                "expiring_threshold_days must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(default_database_path)
    }
}

/// `<local data dir>/archiflow/contracts.db`; `./archiflow/contracts.db` when
/// the platform reports no data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("archiflow")
        .join(schemas::DEFAULT_DB_NAME)
}
