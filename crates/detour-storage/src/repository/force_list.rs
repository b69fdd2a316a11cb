//! Force-list repository.
//!
//! The list is stored as one JSON array under [`FORCE_LIST_KEY`]. Edits are
//! read-modify-write; callers run them inside one transaction. Every accepted
//! edit stores a sanitized, deduplicated list and records a state change.

use detour_core::sanitize_pattern;
use rusqlite::Connection;
use serde_json::json;

use crate::error::{Result, StorageError};
use crate::models::{ForceListEdit, RejectReason, FORCE_LIST_KEY};
use crate::repository::{ConfigRepo, StateRepo};

/// Repository for force-list operations.
pub struct ForceListRepo;

impl ForceListRepo {
    /// Load the stored list. A missing key is an empty list.
    pub fn get(conn: &Connection) -> Result<Vec<String>> {
        Ok(ConfigRepo::get_typed(conn, FORCE_LIST_KEY)?.unwrap_or_default())
    }

    /// Append a pattern after sanitizing it.
    pub fn add(conn: &Connection, raw: &str) -> Result<ForceListEdit> {
        let mut list = Self::get(conn)?;
        let edit = add_to(&mut list, raw);
        if edit.is_change() {
            Self::store(conn, &list)?;
        }
        Ok(edit)
    }

    /// Replace the pattern at `index` after sanitizing the input.
    pub fn update(conn: &Connection, index: usize, raw: &str) -> Result<ForceListEdit> {
        let mut list = Self::get(conn)?;
        let edit = update_in(&mut list, index, raw)?;
        if edit.is_change() {
            Self::store(conn, &list)?;
        }
        Ok(edit)
    }

    /// Remove the pattern at `index`, returning it.
    pub fn remove(conn: &Connection, index: usize) -> Result<String> {
        let mut list = Self::get(conn)?;
        if index >= list.len() {
            return Err(StorageError::IndexOutOfRange {
                index,
                len: list.len(),
            });
        }
        let removed = list.remove(index);
        Self::store(conn, &list)?;
        Ok(removed)
    }

    /// Replace the whole list. Entries are sanitized, empty ones dropped and
    /// later duplicates removed. Returns the stored list.
    pub fn replace(conn: &Connection, patterns: &[String]) -> Result<Vec<String>> {
        let list = normalize(patterns);
        Self::store(conn, &list)?;
        Ok(list)
    }

    fn store(conn: &Connection, list: &[String]) -> Result<()> {
        ConfigRepo::set(conn, FORCE_LIST_KEY, &json!(list))?;
        StateRepo::record(conn, FORCE_LIST_KEY)?;
        Ok(())
    }
}

/// Sanitizes and deduplicates a list, keeping first occurrences in order.
pub fn normalize(patterns: &[String]) -> Vec<String> {
    let mut list: Vec<String> = Vec::with_capacity(patterns.len());
    for pattern in patterns.iter().filter_map(|p| sanitize_pattern(p)) {
        if !list.contains(&pattern) {
            list.push(pattern);
        }
    }
    list
}

fn add_to(list: &mut Vec<String>, raw: &str) -> ForceListEdit {
    let Some(pattern) = sanitize_pattern(raw) else {
        return ForceListEdit::Rejected {
            reason: RejectReason::Empty,
        };
    };

    if list.contains(&pattern) {
        return ForceListEdit::Rejected {
            reason: RejectReason::Duplicate,
        };
    }

    list.push(pattern.clone());
    ForceListEdit::Added { pattern }
}

fn update_in(list: &mut [String], index: usize, raw: &str) -> Result<ForceListEdit> {
    let current = list
        .get(index)
        .cloned()
        .ok_or(StorageError::IndexOutOfRange {
            index,
            len: list.len(),
        })?;

    let Some(pattern) = sanitize_pattern(raw) else {
        return Ok(ForceListEdit::Rejected {
            reason: RejectReason::Empty,
        });
    };

    if pattern == current {
        return Ok(ForceListEdit::Unchanged);
    }

    if list.contains(&pattern) {
        return Ok(ForceListEdit::Rejected {
            reason: RejectReason::Duplicate,
        });
    }

    list[index] = pattern.clone();
    Ok(ForceListEdit::Updated {
        index,
        from: current,
        to: pattern,
    })
}
