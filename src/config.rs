//! Configuration module for Satchel

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Content language requested from the portal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Zh => write!(f, "zh"),
        }
    }
}

/// Base URLs of the two portal hosts: the identity provider that issues
/// login tickets and the learning site that serves course content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalUrls {
    /// Identity provider base URL (ticket-issuing login host)
    #[serde(default = "default_id_base")]
    pub id_base: String,

    /// Learning site base URL (course content host)
    #[serde(default = "default_learn_base")]
    pub learn_base: String,
}

impl Default for PortalUrls {
    fn default() -> Self {
        Self {
            id_base: default_id_base(),
            learn_base: default_learn_base(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Portal host URLs
    #[serde(default)]
    pub portal: PortalUrls,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Auto-refresh interval for `watch` mode in seconds (0 = manual only)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Idle seconds after which `watch` mode assumes the session expired
    #[serde(default = "default_relogin_threshold")]
    pub relogin_threshold_secs: u64,

    /// Content language requested from the portal
    #[serde(default)]
    pub language: Language,
}

fn default_id_base() -> String {
    "https://id.campus.edu".to_string()
}

fn default_learn_base() -> String {
    "https://learn.campus.edu".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    0 // Manual refresh by default
}

fn default_relogin_threshold() -> u64 {
    10 * 60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal: PortalUrls::default(),
            request_timeout_secs: default_request_timeout(),
            refresh_interval_secs: default_refresh_interval(),
            relogin_threshold_secs: default_relogin_threshold(),
            language: Language::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("satchel");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}
