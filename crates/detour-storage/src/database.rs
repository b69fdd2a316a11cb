//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde_json::json;
use tracing::info;

use crate::connection::SharedConnection;
use crate::error::{Result, StorageError};
use crate::models::{ForceListEdit, Settings, StateChange, ENABLED_KEY};
use crate::repository::{ConfigRepo, ForceListRepo, MarkerRepo, StateRepo};

/// High-level database interface for Detour.
#[derive(Clone)]
pub struct Database {
    conn: SharedConnection,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let conn = SharedConnection::open(&path)?;

        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: SharedConnection::in_memory()?,
        })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "detour", "detour").ok_or(StorageError::NoDataDir)?;
        Ok(proj_dirs.data_dir().join("detour.db"))
    }

    // === Config ===

    /// Set a raw configuration value and record the change.
    pub fn set_config(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.conn.write(|conn| {
            ConfigRepo::set(conn, key, value)?;
            StateRepo::record(conn, key)?;
            Ok(())
        })
    }

    // === Settings ===

    /// Write `enabled = true` if the flag has never been stored.
    ///
    /// Returns true if the default was written.
    pub fn ensure_defaults(&self) -> Result<bool> {
        let written = self.conn.write(|conn| {
            if ConfigRepo::get(conn, ENABLED_KEY)?.is_some() {
                return Ok(false);
            }
            ConfigRepo::set(conn, ENABLED_KEY, &json!(true))?;
            StateRepo::record(conn, ENABLED_KEY)?;
            Ok(true)
        })?;

        if written {
            info!("Initialized default settings");
        }
        Ok(written)
    }

    /// Load both settings in one read.
    ///
    /// A malformed force list is an error; a malformed enabled flag reads as
    /// the default (`true`).
    pub fn load_settings(&self) -> Result<Settings> {
        let conn = self.conn.get();
        Ok(Settings {
            enabled: ConfigRepo::get_or_default(&conn, ENABLED_KEY, true)?,
            force_list: ForceListRepo::get(&conn)?,
        })
    }

    /// Whether redirection is enabled. Absent means enabled.
    pub fn is_enabled(&self) -> Result<bool> {
        let conn = self.conn.get();
        ConfigRepo::get_or_default(&conn, ENABLED_KEY, true)
    }

    /// Set the enabled flag.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.set_config(ENABLED_KEY, &json!(enabled))
    }

    /// Get the stored force list.
    pub fn get_force_list(&self) -> Result<Vec<String>> {
        let conn = self.conn.get();
        ForceListRepo::get(&conn)
    }

    /// Replace the force list. Returns the stored (normalized) list.
    pub fn set_force_list(&self, patterns: &[String]) -> Result<Vec<String>> {
        self.conn.write(|conn| ForceListRepo::replace(conn, patterns))
    }

    /// Append a pattern.
    pub fn add_force_pattern(&self, raw: &str) -> Result<ForceListEdit> {
        self.conn.write(|conn| ForceListRepo::add(conn, raw))
    }

    /// Edit the pattern at `index`.
    pub fn update_force_pattern(&self, index: usize, raw: &str) -> Result<ForceListEdit> {
        self.conn
            .write(|conn| ForceListRepo::update(conn, index, raw))
    }

    /// Delete the pattern at `index`, returning it.
    pub fn remove_force_pattern(&self, index: usize) -> Result<String> {
        self.conn.write(|conn| ForceListRepo::remove(conn, index))
    }

    // === State Changes ===

    /// Latest settings change sequence (0 when nothing was ever written).
    pub fn latest_change_seq(&self) -> Result<i64> {
        let conn = self.conn.get();
        StateRepo::latest_seq(&conn)
    }

    /// Changes recorded after `since_seq`, oldest first.
    pub fn changes_since(&self, since_seq: i64) -> Result<Vec<StateChange>> {
        let conn = self.conn.get();
        StateRepo::changes_since(&conn, since_seq)
    }

    /// Trim the change log to the newest `keep_count` records.
    pub fn cleanup_old_changes(&self, keep_count: i64) -> Result<u64> {
        let conn = self.conn.get();
        StateRepo::cleanup(&conn, keep_count)
    }

    // === Session Markers ===

    /// Set the redirect marker for a session.
    pub fn mark_session(&self, session_id: i64) -> Result<()> {
        let conn = self.conn.get();
        MarkerRepo::mark(&conn, session_id)
    }

    /// Test-and-clear the redirect marker for a session.
    pub fn consume_session_marker(&self, session_id: i64) -> Result<bool> {
        let conn = self.conn.get();
        MarkerRepo::consume(&conn, session_id)
    }

    /// Clear the redirect marker for a session.
    pub fn clear_session_marker(&self, session_id: i64) -> Result<()> {
        let conn = self.conn.get();
        MarkerRepo::clear(&conn, session_id)
    }

    /// Clear all redirect markers. Returns the number removed.
    pub fn clear_all_session_markers(&self) -> Result<u64> {
        let conn = self.conn.get();
        MarkerRepo::clear_all(&conn)
    }
}
