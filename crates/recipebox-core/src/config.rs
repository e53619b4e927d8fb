//! Configuration management for recipebox.
//!
//! Loads configuration from ${RECIPEBOX_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API base URL.
pub const BASE_URL_ENV: &str = "RECIPEBOX_BASE_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for recipebox configuration and data directories.
    //!
    //! RECIPEBOX_HOME resolution order:
    //! 1. RECIPEBOX_HOME environment variable (if set)
    //! 2. ~/.config/recipebox (default)

    use std::path::PathBuf;

    /// Returns the recipebox home directory.
    ///
    /// Falls back to a relative `.recipebox` directory when no home
    /// directory can be determined.
    pub fn recipebox_home() -> PathBuf {
        if let Ok(home) = std::env::var("RECIPEBOX_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".recipebox"),
            |h| h.join(".config").join("recipebox"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        recipebox_home().join("config.toml")
    }

    /// Returns the path to the persistent client storage file.
    pub fn storage_path() -> PathBuf {
        recipebox_home().join("storage.json")
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> PathBuf {
        recipebox_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the recipe catalog API
    pub base_url: String,
    /// `EnvFilter` directive for the log file
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            log_filter: Self::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8080/api";
    pub const DEFAULT_LOG_FILTER: &'static str = "info";

    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the default config template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Resolves the API base URL.
    ///
    /// Resolution order:
    /// 1. `RECIPEBOX_BASE_URL` env var (if set and non-empty)
    /// 2. `base_url` from config (if non-empty)
    /// 3. Default: `http://localhost:8080/api`
    ///
    /// # Errors
    /// Returns an error if the chosen URL is malformed.
    pub fn resolve_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var(BASE_URL_ENV) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.to_string());
            }
        }

        let trimmed = self.base_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }

        Ok(Self::DEFAULT_BASE_URL.to_string())
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}
