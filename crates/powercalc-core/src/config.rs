//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which names the origin the static assets are fetched from and the prefix
//! used for asset cache versions.
//!
//! Configuration is stored at `~/.config/powercalc/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets::DEFAULT_CACHE_PREFIX;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "powercalc";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured asset origin
pub const ASSET_URL_ENV: &str = "POWERCALC_ASSET_URL";

/// Origin used when neither the environment nor the config names one
const DEFAULT_ASSET_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub asset_base_url: Option<String>,
    pub cache_prefix: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the config, writing the defaults out on first run so there is a
    /// file to edit.
    pub fn load_or_init() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            return Self::load_from(&path);
        }
        let config = Self::default();
        config.save_to(&path)?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory holding one subdirectory per asset cache version.
    pub fn assets_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("assets"))
    }

    /// Asset origin: environment override, then config, then the default.
    pub fn asset_origin(&self) -> String {
        Self::resolve_origin(std::env::var(ASSET_URL_ENV).ok(), self.asset_base_url.as_deref())
    }

    fn resolve_origin(env: Option<String>, configured: Option<&str>) -> String {
        env.filter(|url| !url.trim().is_empty())
            .or_else(|| configured.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ASSET_ORIGIN.to_string())
    }

    pub fn cache_prefix(&self) -> &str {
        self.cache_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_CACHE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_prefix(), DEFAULT_CACHE_PREFIX);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            asset_base_url: Some("https://calc.example.com".to_string()),
            cache_prefix: Some("calc-v".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.cache_prefix(), "calc-v");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_resolve_origin_precedence() {
        assert_eq!(
            Config::resolve_origin(Some("http://env".into()), Some("http://cfg")),
            "http://env"
        );
        assert_eq!(
            Config::resolve_origin(Some("  ".into()), Some("http://cfg")),
            "http://cfg"
        );
        assert_eq!(Config::resolve_origin(None, None), DEFAULT_ASSET_ORIGIN);
    }
}
