//! State change log.
//!
//! Every settings write appends a row here in the same transaction, so a
//! reader that polls `MAX(seq)` sees a settled value once the sequence moves.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::StateChange;

/// Repository for the `state_changes` table.
pub struct StateRepo;

impl StateRepo {
    /// Record a state change for cache invalidation. Returns its sequence.
    pub fn record(conn: &Connection, state_key: &str) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO state_changes (state_key, changed_at) VALUES (?1, ?2)",
            params![state_key, now],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get the latest state change sequence number (0 when empty).
    pub fn latest_seq(conn: &Connection) -> Result<i64> {
        let seq: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM state_changes", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0))
    }

    /// Get state changes after `since_seq`, oldest first.
    pub fn changes_since(conn: &Connection, since_seq: i64) -> Result<Vec<StateChange>> {
        let mut stmt = conn.prepare(
            "SELECT seq, state_key, changed_at FROM state_changes WHERE seq > ?1 ORDER BY seq",
        )?;

        let changes = stmt
            .query_map(params![since_seq], |row| {
                let seq: i64 = row.get(0)?;
                let state_key: String = row.get(1)?;
                let changed_at: String = row.get(2)?;

                Ok(StateChange {
                    seq,
                    state_key,
                    changed_at: DateTime::parse_from_rfc3339(&changed_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(changes)
    }

    /// Delete all but the newest `keep_count` records.
    /// Returns the number of records deleted.
    pub fn cleanup(conn: &Connection, keep_count: i64) -> Result<u64> {
        let threshold: Option<i64> = conn
            .query_row(
                "SELECT seq FROM state_changes ORDER BY seq DESC LIMIT 1 OFFSET ?1",
                params![keep_count],
                |row| row.get(0),
            )
            .optional()?;

        match threshold {
            Some(threshold_seq) => {
                let deleted = conn.execute(
                    "DELETE FROM state_changes WHERE seq <= ?1",
                    params![threshold_seq],
                )?;
                Ok(deleted as u64)
            }
            None => Ok(0),
        }
    }
}
