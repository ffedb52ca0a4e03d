//! Common paths for Satchel data storage
//!
//! All Satchel data is stored under ~/.config/satchel/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted portal credentials
//! - satchel.sqlite - State database (courses, notices, assignments, files)
//! - downloads/ - Downloaded course files

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the Satchel data directory (~/.config/satchel/)
///
/// This is consistent across all platforms for simplicity.
pub fn satchel_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let satchel_dir = home.join(".config").join("satchel");
    fs::create_dir_all(&satchel_dir).context("Failed to create satchel directory")?;
    Ok(satchel_dir)
}

/// Get the config file path (~/.config/satchel/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(satchel_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/satchel/satchel.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(satchel_dir()?.join("satchel.sqlite"))
}

/// Get the credentials file path (~/.config/satchel/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(satchel_dir()?.join("credentials.enc"))
}

/// Get the downloads directory (~/.config/satchel/downloads/), creating it if needed
pub fn downloads_dir() -> Result<PathBuf> {
    let dir = satchel_dir()?.join("downloads");
    fs::create_dir_all(&dir).context("Failed to create downloads directory")?;
    Ok(dir)
}
