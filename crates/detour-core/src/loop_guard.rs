//! Per-session redirect markers.
//!
//! Issuing a redirect makes the host start a fresh navigation for the same
//! session. The marker set just before the redirect lets that navigation
//! through once without re-classification, so a decision can never bounce
//! between the proxied and direct forms of a URL.

use dashmap::DashMap;

use crate::error::MarkerError;
use crate::event::SessionId;

/// Result type for marker store operations.
pub type MarkerResult<T> = std::result::Result<T, MarkerError>;

/// Storage for one-shot redirect markers, keyed by session.
///
/// Implementations must be safe to call from concurrent event handlers for
/// different sessions. Marking is idempotent; it is a flag, not a counter.
pub trait MarkerStore: Send + Sync {
    /// Marks the session's next navigation as caused by a redirect.
    fn mark(&self, session_id: SessionId) -> MarkerResult<()>;

    /// Clears the marker, returning whether it was set.
    fn consume(&self, session_id: SessionId) -> MarkerResult<bool>;

    /// Clears the marker unconditionally (session terminated).
    fn clear(&self, session_id: SessionId) -> MarkerResult<()>;
}

/// In-memory marker store.
#[derive(Debug, Default)]
pub struct LoopGuard {
    markers: DashMap<SessionId, ()>,
}

impl LoopGuard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a marker is pending for the session.
    pub fn is_marked(&self, session_id: SessionId) -> bool {
        self.markers.contains_key(&session_id)
    }

    /// Number of sessions with a pending marker.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if no marker is pending.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl MarkerStore for LoopGuard {
    fn mark(&self, session_id: SessionId) -> MarkerResult<()> {
        self.markers.insert(session_id, ());
        Ok(())
    }

    fn consume(&self, session_id: SessionId) -> MarkerResult<bool> {
        Ok(self.markers.remove(&session_id).is_some())
    }

    fn clear(&self, session_id: SessionId) -> MarkerResult<()> {
        self.markers.remove(&session_id);
        Ok(())
    }
}
