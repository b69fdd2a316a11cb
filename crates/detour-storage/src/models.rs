//! Data models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings key holding the ordered force list (JSON array of strings).
pub const FORCE_LIST_KEY: &str = "force_list";

/// Settings key holding the global enabled flag (JSON bool).
pub const ENABLED_KEY: &str = "enabled";

/// A configuration entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration key.
    pub key: String,
    /// Configuration value (JSON).
    pub value: serde_json::Value,
}

/// Snapshot of the user-editable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether redirection is active.
    pub enabled: bool,
    /// Force-list patterns in display order.
    pub force_list: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            force_list: Vec::new(),
        }
    }
}

/// State change record for cache invalidation.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub seq: i64,
    pub state_key: String,
    pub changed_at: DateTime<Utc>,
}

/// Why a force-list edit was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Nothing left after sanitizing.
    Empty,
    /// The sanitized pattern is already in the list.
    Duplicate,
}

/// Outcome of a force-list edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ForceListEdit {
    /// Pattern appended.
    Added { pattern: String },
    /// Pattern at `index` replaced.
    Updated {
        index: usize,
        from: String,
        to: String,
    },
    /// The sanitized input equals the current value.
    Unchanged,
    /// Input rejected; the list was not modified.
    Rejected { reason: RejectReason },
}

impl ForceListEdit {
    /// Returns true if the stored list changed.
    pub fn is_change(&self) -> bool {
        matches!(self, ForceListEdit::Added { .. } | ForceListEdit::Updated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_is_enabled_and_empty() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.force_list.is_empty());
    }

    #[test]
    fn edit_serializes_with_tag() {
        let edit = ForceListEdit::Rejected {
            reason: RejectReason::Duplicate,
        };
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json["result"], "rejected");
        assert_eq!(json["reason"], "duplicate");
    }

    #[test]
    fn edit_is_change() {
        assert!(ForceListEdit::Added {
            pattern: "a.com".into()
        }
        .is_change());
        assert!(!ForceListEdit::Unchanged.is_change());
    }
}
