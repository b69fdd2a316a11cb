//! Application state for the API server.

use std::sync::Arc;

use detour_core::{ProxyPrefix, RedirectEngine};
use detour_storage::Database;

use crate::auth::ApiToken;
use crate::sync::SettingsCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Settings storage.
    pub db: Arc<Database>,
    /// Redirect decision engine.
    pub engine: Arc<RedirectEngine>,
    /// Keeps the engine in step with stored settings.
    pub settings: Arc<SettingsCache>,
    /// Required on settings writes.
    pub api_token: Arc<ApiToken>,
}

impl AppState {
    /// Creates state around an engine and a database, loading the stored
    /// settings into the engine.
    pub fn new(db: Database, engine: RedirectEngine, api_token: ApiToken) -> Self {
        let db = Arc::new(db);
        let engine = Arc::new(engine);
        let settings = Arc::new(SettingsCache::new(db.clone(), engine.clone()));
        Self::with_components(db, engine, settings, api_token)
    }

    /// Creates state from shared components.
    pub fn with_components(
        db: Arc<Database>,
        engine: Arc<RedirectEngine>,
        settings: Arc<SettingsCache>,
        api_token: ApiToken,
    ) -> Self {
        settings.refresh();
        Self {
            db,
            engine,
            settings,
            api_token: Arc::new(api_token),
        }
    }

    /// Creates state with an in-memory database, in-memory markers and a
    /// fresh token.
    pub fn in_memory() -> detour_storage::Result<Self> {
        let db = Database::in_memory()?;
        db.ensure_defaults()?;
        Ok(Self::new(
            db,
            RedirectEngine::in_memory(ProxyPrefix::default()),
            ApiToken::generate(),
        ))
    }
}
