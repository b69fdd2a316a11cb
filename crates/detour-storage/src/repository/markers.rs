//! Session marker repository.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;

/// Repository for the `session_markers` table.
pub struct MarkerRepo;

impl MarkerRepo {
    /// Set the marker for a session. Marking twice keeps one row.
    pub fn mark(conn: &Connection, session_id: i64) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO session_markers (session_id, marked_at) VALUES (?1, ?2)",
            params![session_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove the marker, returning whether one was set.
    ///
    /// A single DELETE is the test-and-clear, so two consumers never both
    /// observe the same marker.
    pub fn consume(conn: &Connection, session_id: i64) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM session_markers WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(deleted > 0)
    }

    /// Remove the marker if present.
    pub fn clear(conn: &Connection, session_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM session_markers WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    /// Remove every marker. Returns the number removed.
    pub fn clear_all(conn: &Connection) -> Result<u64> {
        let deleted = conn.execute("DELETE FROM session_markers", [])?;
        Ok(deleted as u64)
    }
}
