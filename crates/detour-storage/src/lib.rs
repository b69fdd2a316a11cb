//! Detour Storage - SQLite persistence layer.
//!
//! This crate stores the user-editable settings and, optionally, the
//! per-session redirect markers:
//!
//! - The force list and the enabled flag (JSON values in a key-value table)
//! - A change log that readers poll to pick up settings edits
//! - Redirect markers for the persisted [`detour_core::MarkerStore`]
//!
//! # Example
//!
//! ```no_run
//! use detour_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//! db.ensure_defaults().unwrap();
//!
//! db.add_force_pattern("https://www.example.com/").unwrap();
//! let settings = db.load_settings().unwrap();
//! assert_eq!(settings.force_list, vec!["example.com".to_string()]);
//! ```

mod connection;
mod database;
pub mod error;
mod markers;
pub mod models;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use markers::PersistentMarkers;
pub use models::{
    Config, ForceListEdit, RejectReason, Settings, StateChange, ENABLED_KEY, FORCE_LIST_KEY,
};
