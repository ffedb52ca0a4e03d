//! Database module for `SQLite` storage (persisted state slices)
//!
//! Persistence is deliberately dumb: each state slice serializes to one
//! JSON row keyed by slice name. The slice structs themselves decide what
//! gets persisted via `serde(skip)` on transient fields, so the schema
//! never chases the state layout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing::warn;

use crate::paths;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open_path(&path)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;

        let db = Self { conn };
        db.init()?;

        Ok(db)
    }

    /// Get the default database path
    pub fn default_path() -> Result<PathBuf> {
        paths::database_path()
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Persisted state slices, one JSON row per slice
            CREATE TABLE IF NOT EXISTS slices (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    // ==================== Slices ====================

    /// Write one slice, replacing any previous row
    pub fn save_slice<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize slice")?;
        self.conn.execute(
            r"INSERT OR REPLACE INTO slices (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read one slice back.
    ///
    /// A missing or unparseable row reads as `None`: stale rows from an
    /// older layout degrade to defaults instead of blocking startup.
    pub fn load_slice<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json: String = match self.conn.query_row(
            "SELECT value FROM slices WHERE key = ?1",
            params![key],
            |row| row.get(0),
        ) {
            Ok(json) => json,
            Err(rusqlite::Error::QueryReturnedNoRows) => return None,
            Err(err) => {
                warn!(key, "failed to read persisted slice: {err}");
                return None;
            }
        };

        serde_json::from_str(&json)
            .map_err(|err| warn!(key, "discarding unparseable persisted slice: {err}"))
            .ok()
    }

    /// When a slice was last written
    pub fn slice_updated_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.conn
            .query_row(
                "SELECT updated_at FROM slices WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .ok()
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Drop every persisted slice (logout)
    pub fn clear_slices(&self) -> Result<usize> {
        let count = self.conn.execute("DELETE FROM slices", params![])?;
        Ok(count)
    }
}
