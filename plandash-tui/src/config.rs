//! Runtime configuration.
//!
//! Loaded from `<config dir>/plandash/config.toml` when present, then
//! environment overrides, then command-line flags (applied in `main`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutConfig;

/// Default proxy endpoint used by the dashboard
pub const DEFAULT_PROXY_URL: &str = "http://localhost:3001";
/// Default upstream product-information API
pub const DEFAULT_UPSTREAM_URL: &str = "https://app.salsify.com/api/v1/products";

const API_KEY_ENV: &str = "PLANDASH_API_KEY";
const PROXY_URL_ENV: &str = "PLANDASH_PROXY_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub port: u16,
    pub upstream_url: String,
    /// Bearer token for the upstream API; usually supplied via environment
    pub api_key: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
        }
    }
}

/// Terminal mapping of layout pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub pixels_per_column: f64,
    pub pixels_per_row: f64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            pixels_per_column: 8.0,
            pixels_per_row: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where planning data and logs live; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
    /// Image proxy the dashboard talks to
    pub proxy_url: String,
    pub proxy: ProxyConfig,
    pub timeline: LayoutConfig,
    pub terminal: TerminalConfig,
    /// Start the timeline grouped by brand
    pub group_by_brand: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            proxy: ProxyConfig::default(),
            timeline: LayoutConfig::default(),
            terminal: TerminalConfig::default(),
            group_by_brand: false,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("plandash").join("config.toml"))
    }

    /// Load from `path`, or from the default location. A missing file
    /// yields defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.proxy.api_key = Some(key);
        }
        if let Some(url) = lookup(PROXY_URL_ENV).filter(|u| !u.is_empty()) {
            self.proxy_url = url;
        }
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("plandash")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            group_by_brand = true

            [proxy]
            port = 8080

            [timeline]
            zoom_max = 4.0
            "#,
        )
        .unwrap();

        assert!(config.group_by_brand);
        assert_eq!(config.proxy.port, 8080);
        assert_eq!(config.proxy.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.timeline.zoom_max, 4.0);
        assert_eq!(config.timeline.min_width, 1000.0);
        assert_eq!(config.proxy_url, DEFAULT_PROXY_URL);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        assert!(Config::from_toml("proxy = 3").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "PLANDASH_API_KEY" => Some("secret".to_string()),
            "PLANDASH_PROXY_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.proxy.api_key.as_deref(), Some("secret"));
        assert_eq!(config.proxy_url, DEFAULT_PROXY_URL);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "proxy_url = \"http://127.0.0.1:9000\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.proxy_url == "http://127.0.0.1:9000" || std::env::var(PROXY_URL_ENV).is_ok());

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
