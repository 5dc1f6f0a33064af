//! # Configuration Management Module
//!
//! Magic Buddy reads a single TOML file. Every section has defaults, so a
//! missing section falls back to built-in values.
//!
//! ## Configuration Structure
//!
//! - [`AppConfig`] - Display name and the names used for a first-run user
//! - [`StorageConfig`] - Where the sled database lives
//! - [`ContentConfig`] - Optional seed directory replacing the built-in catalog
//! - [`SyncConfig`] - Limits for imported sync payloads
//! - [`LoggingConfig`] - Logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use magic_buddy::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("magic-buddy.toml").await?;
//!     let config = Config::load("magic-buddy.toml").await?;
//!     println!("Database: {}", config.storage.db_path().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [app]
//! name = "Magic English Buddy"
//! default_user_name = "Reader"
//! default_buddy_name = "Sparky"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [content]
//! seed_dir = "./data/seeds"
//!
//! [sync]
//! max_payload_len = 4096
//!
//! [logging]
//! level = "info"
//! file = "magic-buddy.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::buddy::sync::{DEFAULT_MAX_PAYLOAD_LEN, MAGIC_TAG};
use crate::validation::{validate_buddy_name, validate_reader_name};

pub const DEFAULT_CONFIG_PATH: &str = "magic-buddy.toml";
const DB_FILE_NAME: &str = "buddy.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    /// Name given to the user created on first run.
    pub default_user_name: String,
    pub default_buddy_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Magic English Buddy".to_string(),
            default_user_name: "Reader".to_string(),
            default_buddy_name: "Sparky".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DB_FILE_NAME)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentConfig {
    /// Directory holding map.json, stories.json, dictionary.json and
    /// (optionally) achievements.json. Unset means the built-in catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

fn default_max_payload_len() -> usize {
    DEFAULT_MAX_PAYLOAD_LEN
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("magic-buddy.log".to_string()),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.sync.max_payload_len <= MAGIC_TAG.len() {
            return Err(anyhow!(
                "sync.max_payload_len must be larger than {}",
                MAGIC_TAG.len()
            ));
        }
        validate_reader_name(&self.app.default_user_name)
            .map_err(|e| anyhow!("app.default_user_name: {}", e))?;
        validate_buddy_name(&self.app.default_buddy_name)
            .map_err(|e| anyhow!("app.default_buddy_name: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.max_payload_len, 4096);
        assert!(config.content.seed_dir.is_none());
        assert_eq!(config.storage.db_path(), PathBuf::from("./data").join("buddy.db"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[storage]\ndata_dir = \"/tmp/buddy\"\n").unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/buddy");
        assert_eq!(config.app.default_buddy_name, "Sparky");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_tiny_payload_limit() {
        let mut config = Config::default();
        config.sync.max_payload_len = 2;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn create_default_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("magic-buddy.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.app.name, "Magic English Buddy");
        assert_eq!(loaded.logging.file.as_deref(), Some("magic-buddy.log"));
    }

    #[test]
    fn invalid_buddy_name_fails_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("magic-buddy.toml");
        std::fs::write(&path, "[app]\ndefault_buddy_name = \"Mr Sparky\"\n").unwrap();
        let result = tokio_test::block_on(Config::load(path.to_str().unwrap()));
        assert!(result.is_err());
    }
}
