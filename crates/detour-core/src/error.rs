//! Core error types.

use thiserror::Error;

use crate::event::SessionId;

/// Errors raised while configuring the decision engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The proxy prefix is not an absolute http(s) URL ending in `/`.
    #[error("invalid proxy prefix: {0}")]
    InvalidPrefix(String),
}

/// Errors from a session marker store.
///
/// The in-memory store never fails; persisted stores surface their
/// backend errors through these variants.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The backing store rejected or could not complete the operation.
    #[error("marker backend failed for session {session_id}: {message}")]
    Backend {
        /// Session the operation was addressed to.
        session_id: SessionId,
        /// Backend error description.
        message: String,
    },
}

impl MarkerError {
    /// Wraps a backend failure for the given session.
    pub fn backend(session_id: SessionId, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            session_id,
            message: err.to_string(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
