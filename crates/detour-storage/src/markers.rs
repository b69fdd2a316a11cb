//! SQLite-backed redirect markers.

use detour_core::{MarkerError, MarkerResult, MarkerStore, SessionId};

use crate::database::Database;

/// [`MarkerStore`] that keeps markers in the `session_markers` table.
///
/// Markers survive a process restart, but sessions do not, so callers clear
/// the table on startup with [`Database::clear_all_session_markers`].
#[derive(Clone)]
pub struct PersistentMarkers {
    db: Database,
}

impl PersistentMarkers {
    /// Creates a store on top of an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl MarkerStore for PersistentMarkers {
    fn mark(&self, session_id: SessionId) -> MarkerResult<()> {
        self.db
            .mark_session(session_id)
            .map_err(|e| MarkerError::backend(session_id, e))
    }

    fn consume(&self, session_id: SessionId) -> MarkerResult<bool> {
        self.db
            .consume_session_marker(session_id)
            .map_err(|e| MarkerError::backend(session_id, e))
    }

    fn clear(&self, session_id: SessionId) -> MarkerResult<()> {
        self.db
            .clear_session_marker(session_id)
            .map_err(|e| MarkerError::backend(session_id, e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use detour_core::{NavigationEvent, PolicyList, ProxyPrefix, RedirectEngine};

    use super::*;

    #[test]
    fn test_marker_store_contract() {
        let store = PersistentMarkers::new(Database::in_memory().unwrap());

        assert!(!store.consume(5).unwrap());
        store.mark(5).unwrap();
        store.mark(5).unwrap();
        assert!(store.consume(5).unwrap());
        assert!(!store.consume(5).unwrap());

        store.mark(6).unwrap();
        store.clear(6).unwrap();
        assert!(!store.consume(6).unwrap());
    }

    #[test]
    fn test_engine_with_persistent_markers() {
        let db = Database::in_memory().unwrap();
        let engine = RedirectEngine::new(
            ProxyPrefix::default(),
            Arc::new(PersistentMarkers::new(db.clone())),
        )
        .with_policy(PolicyList::from_patterns(["example.com"]));

        let action = engine
            .on_navigation_start(&NavigationEvent::top_level(3, "https://example.com/"))
            .unwrap();

        // The proxied navigation consumes the stored marker
        assert!(engine
            .on_navigation_start(&NavigationEvent::top_level(3, &action.target_url))
            .is_none());
        assert!(!db.consume_session_marker(3).unwrap());
    }
}
