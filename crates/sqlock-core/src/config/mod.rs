//! Configuration management with file persistence

use crate::domain::locking::SQLITE_PROVIDER_NAME;
use crate::error::{Error, Result};
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Sqlock configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub locking: LockingConfig,
}

/// Connection settings consumed by the locking mechanism's eligibility check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string, e.g. `sqlite:/var/lib/app/app.db`
    pub connection_string: Option<String>,
    /// Provider the connection string belongs to
    pub provider_name: String,
    /// Engine busy timeout applied to every pooled connection
    pub busy_timeout_ms: u64,
    pub max_connections: u32,
}

/// Default lock timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingConfig {
    pub read_lock_timeout_ms: u64,
    pub write_lock_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            connection_string: None,
            provider_name: SQLITE_PROVIDER_NAME.to_string(),
            busy_timeout_ms: 30_000,
            max_connections: 5,
        }
    }
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            read_lock_timeout_ms: 60_000,
            write_lock_timeout_ms: 5_000,
        }
    }
}

impl LockingConfig {
    pub fn read_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.read_lock_timeout_ms)
    }

    pub fn write_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.write_lock_timeout_ms)
    }
}

impl DatabaseSettings {
    /// Connection string, preferring `SQLOCK_CONNECTION_STRING` over the file value
    pub fn resolved_connection_string(&self) -> Option<String> {
        env::var("SQLOCK_CONNECTION_STRING")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.connection_string.clone())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SQLOCK_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("sqlock")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or return defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.provider_name.trim().is_empty() {
            return Err(Error::ConfigError(
                "database.provider_name must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(Error::ConfigError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.locking.write_lock_timeout_ms == 0 {
            return Err(Error::ConfigError(
                "locking.write_lock_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.connection_string" => Ok(self
                .database
                .connection_string
                .clone()
                .unwrap_or_else(|| "(not set - use SQLOCK_CONNECTION_STRING env var)".to_string())),
            "database.provider_name" => Ok(self.database.provider_name.clone()),
            "database.busy_timeout_ms" => Ok(self.database.busy_timeout_ms.to_string()),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),

            "locking.read_lock_timeout_ms" => Ok(self.locking.read_lock_timeout_ms.to_string()),
            "locking.write_lock_timeout_ms" => Ok(self.locking.write_lock_timeout_ms.to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `sqlock config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.connection_string" => {
                let value = value.trim();
                self.database.connection_string = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "database.provider_name" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Provider name must not be empty"));
                }
                self.database.provider_name = value.trim().to_string();
            }
            "database.busy_timeout_ms" => {
                self.database.busy_timeout_ms = value
                    .parse()
                    .with_context(|| format!("Invalid busy_timeout_ms value: {}", value))?;
            }
            "database.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_connections must be at least 1"));
                }
                self.database.max_connections = max;
            }

            "locking.read_lock_timeout_ms" => {
                self.locking.read_lock_timeout_ms = value
                    .parse()
                    .with_context(|| format!("Invalid read_lock_timeout_ms value: {}", value))?;
            }
            "locking.write_lock_timeout_ms" => {
                let timeout: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid write_lock_timeout_ms value: {}", value))?;
                if timeout == 0 {
                    return Err(anyhow!("write_lock_timeout_ms must be greater than zero"));
                }
                self.locking.write_lock_timeout_ms = timeout;
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `sqlock config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "database.connection_string",
            "database.provider_name",
            "database.busy_timeout_ms",
            "database.max_connections",
            "locking.read_lock_timeout_ms",
            "locking.write_lock_timeout_ms",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
