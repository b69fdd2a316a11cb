//! Database schema.
//!
//! The version lives in SQLite's `user_version` header field.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StorageError};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
    -- Settings as JSON values, keyed by name (force_list, enabled)
    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    -- One row per settings write; readers compare MAX(seq) with their last seen
    CREATE TABLE IF NOT EXISTS state_changes (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        state_key TEXT NOT NULL,
        changed_at TEXT NOT NULL
    );

    -- Pending redirect markers when markers are persisted
    CREATE TABLE IF NOT EXISTS session_markers (
        session_id INTEGER PRIMARY KEY,
        marked_at TEXT NOT NULL
    );
";

/// Create the schema on a fresh database; refuse one from a newer release.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    if version < SCHEMA_VERSION {
        info!("Creating database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_version(conn: &Connection) -> i32 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(user_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in ["config", "state_changes", "session_markers"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} should start empty");
        }
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        assert!(matches!(
            init_schema(&conn),
            Err(StorageError::UnsupportedSchema { found, supported })
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
    }
}
