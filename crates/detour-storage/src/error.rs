//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from rusqlite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A setting could not be encoded for storage.
    #[error("failed to encode setting: {0}")]
    Encode(#[from] serde_json::Error),

    /// A stored setting does not have the expected shape.
    ///
    /// Readers keep their previous value rather than guessing.
    #[error("stored setting `{key}` is malformed: {source}")]
    CorruptSetting {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO error (e.g., creating the data directory).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A force-list edit addressed a position past the end of the list.
    #[error("force list index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The database file was written by a newer release.
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    /// No platform data directory to keep the database in.
    #[error("could not determine the platform data directory")]
    NoDataDir,
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
