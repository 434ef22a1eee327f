// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the BewegungsLiga+ core

pub mod fitness_config;

use crate::constants::env_config;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use fitness_config::FitnessConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

/// Local CSV-backed profile API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Attempts before falling back to degraded defaults
    pub max_attempts: u32,
}

/// Durable client storage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `sqlite:` URL, or `memory` for a non-persistent store
    pub database_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: env_config::DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
            max_attempts: 2,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: env_config::default_database_url(),
        }
    }
}

impl Config {
    fn default_path() -> String {
        dirs::config_dir()
            .map(|p| p.join("bewegungsliga/config.toml"))
            .unwrap_or_else(|| "config.toml".into())
            .to_string_lossy()
            .to_string()
    }

    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")
        } else {
            dotenv::dotenv().ok();
            Self::from_env()
        }
    }

    /// Build configuration from environment variables over defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(url) = env_config::api_url() {
            config.api.base_url = url;
        }
        if let Some(timeout) = env_config::request_timeout_secs() {
            config.api.request_timeout_secs = timeout
                .parse()
                .with_context(|| format!("Invalid {} value", env_config::REQUEST_TIMEOUT_VAR))?;
        }
        if let Some(url) = env_config::database_url() {
            config.storage.database_url = url;
        }

        Ok(config)
    }

    pub fn save(&self, path: Option<String>) -> Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);

        let parent = Path::new(&config_path)
            .parent()
            .context("Invalid config path")?;
        fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Helper function to create a temporary config file
    fn create_temp_config_file(content: &str) -> (TempDir, String) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).expect("Failed to write temp config");
        (temp_dir, config_path.to_string_lossy().to_string())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.max_attempts, 2);
        assert!(config.storage.database_url.starts_with("sqlite:"));
    }

    #[test]
    fn test_config_load_from_file() {
        let config_content = r#"
[api]
base_url = "http://127.0.0.1:9000"
request_timeout_secs = 3

[storage]
database_url = "memory"
"#;

        let (_temp_dir, config_path) = create_temp_config_file(config_content);
        let config = Config::load(Some(config_path)).expect("Failed to load config");

        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.api.request_timeout_secs, 3);
        assert_eq!(config.api.max_attempts, 2);
        assert_eq!(config.storage.database_url, "memory");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let (_temp_dir, config_path) = create_temp_config_file("this is not valid toml [[[");

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_save_creates_directory() {
        let mut config = Config::default();
        config.api.base_url = "http://example.test".to_string();

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested_path = temp_dir.path().join("nested").join("config.toml");
        let nested_path_str = nested_path.to_string_lossy().to_string();

        config.save(Some(nested_path_str.clone())).expect("Failed to save config");
        assert!(nested_path.exists());

        let loaded = Config::load(Some(nested_path_str)).expect("Failed to load saved config");
        assert_eq!(loaded.api.base_url, "http://example.test");
    }
}
