//! Configuration loading

use std::path::Path;

use anyhow::{Context, Result};
use sppble::SppConfig;
use tracing::info;

/// Load configuration from a TOML file, or fall back to defaults
pub fn load_configuration(path: Option<&str>) -> Result<SppConfig> {
    let Some(path) = path else {
        info!("Using default configuration");
        return Ok(SppConfig::default());
    };

    info!("Loading configuration from: {}", path);
    let config = load_from_file(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path))?;
    Ok(config)
}

fn load_from_file(path: impl AsRef<Path>) -> Result<SppConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Render a configuration the way it would be written to disk
pub fn render(config: &SppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}
