// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, prefix `CLASSIFY_CACHE__`)
    /// 2. Config file (`path`, or `~/.classify-cache/config.toml` if present)
    /// 3. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // e.g. CLASSIFY_CACHE__CACHE__CAPACITY=1000
            .add_source(
                Environment::with_prefix("CLASSIFY_CACHE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings the cache cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(AppError::Config("cache.capacity must be greater than 0".into()));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(AppError::Config("cache.ttl_seconds must be greater than 0".into()));
        }
        if self.classifier.max_attempts == 0 {
            return Err(AppError::Config(
                "classifier.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".classify-cache")
            .join("config")
            .to_string_lossy()
            .to_string()
    }
}
