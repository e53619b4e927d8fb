//! `recipebox config` handlers. Neither loads the config file.

use anyhow::{Context, Result};
use recipebox_core::config::{Config, paths};

/// Prints where recipebox keeps its files.
pub fn path() {
    let config_path = paths::config_path();
    let state = if config_path.exists() { "" } else { " (not created)" };
    println!("config:  {}{state}", config_path.display());
    println!("storage: {}", paths::storage_path().display());
    println!("logs:    {}", paths::logs_dir().display());
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("write default config to {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    println!("Set base_url there, or RECIPEBOX_BASE_URL, to point at your server.");
    Ok(())
}
