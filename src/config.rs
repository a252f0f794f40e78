use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::loader::LoadOptions;

/// Comma-separated patterns that replace `catalog.preload` when set.
pub const PRELOAD_ENV_VAR: &str = "CATALOG_PRELOAD_GLOBS";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default)]
    pub preload: Vec<String>,
    #[serde(default)]
    pub dealer_id: Option<String>,
    #[serde(default = "default_infer_dealer")]
    pub infer_dealer_from_filename: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            preload: Vec::new(),
            dealer_id: None,
            infer_dealer_from_filename: true,
        }
    }
}

fn default_infer_dealer() -> bool {
    true
}

impl CatalogConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            dealer_id: self.dealer_id.clone(),
            infer_dealer_from_filename: self.infer_dealer_from_filename,
        }
    }

    /// Startup patterns, with the environment override applied.
    pub fn preload_patterns(&self) -> Vec<String> {
        std::env::var(PRELOAD_ENV_VAR)
            .ok()
            .map(|raw| parse_preload_env(&raw))
            .filter(|patterns| !patterns.is_empty())
            .unwrap_or_else(|| self.preload.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn parse_preload_env(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if let Some(dealer) = &config.catalog.dealer_id {
        if dealer.trim().is_empty() {
            anyhow::bail!("catalog.dealer_id must not be blank when set");
        }
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
