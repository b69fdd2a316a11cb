//! Settings cache for the redirect engine.
//!
//! Keeps the engine's policy snapshot and enabled flag in step with storage
//! without touching the database on every navigation event.
//!
//! ```text
//! Navigation event → RedirectEngine (snapshot, atomic flag)
//!                          ↑ replace_policy / set_enabled
//!                    SettingsCache.refresh() ← API writes
//!                    SettingsCache.poll()    ← background task → Database (change log)
//! ```
//!
//! Settings edits made through the API refresh immediately; edits made by
//! another process sharing the database file are picked up by the polling
//! task within one poll interval. Navigation handlers never poll.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use detour_core::{PolicyList, RedirectEngine};
use detour_storage::Database;

/// Default poll interval for settings changes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pushes stored settings into a [`RedirectEngine`].
pub struct SettingsCache {
    db: Arc<Database>,
    engine: Arc<RedirectEngine>,
    /// Change sequence the engine's settings reflect (-1 before first load).
    last_seq: AtomicI64,
    last_poll: RwLock<Instant>,
    poll_interval: Duration,
    /// Held across read-seq, load and apply so an older load never lands
    /// after a newer one.
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for SettingsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("last_seq", &self.last_seq.load(Ordering::Relaxed))
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl SettingsCache {
    /// Creates a cache. Nothing is loaded until [`SettingsCache::refresh`].
    pub fn new(db: Arc<Database>, engine: Arc<RedirectEngine>) -> Self {
        Self::with_poll_interval(db, engine, DEFAULT_POLL_INTERVAL)
    }

    /// Creates a cache with a custom poll interval.
    pub fn with_poll_interval(
        db: Arc<Database>,
        engine: Arc<RedirectEngine>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            engine,
            last_seq: AtomicI64::new(-1),
            last_poll: RwLock::new(Instant::now()),
            poll_interval,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Change sequence of the last successful load.
    pub fn last_seq(&self) -> i64 {
        self.last_seq.load(Ordering::Relaxed)
    }

    /// Returns the poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Reloads settings if storage changed since the last load.
    ///
    /// Rate-limited to one database check per poll interval. Returns true if
    /// the engine was updated.
    pub fn poll(&self) -> bool {
        let now = Instant::now();
        {
            let last = *self.last_poll.read();
            if now.duration_since(last) < self.poll_interval {
                return false;
            }
        }
        *self.last_poll.write() = now;

        match self.db.changes_since(self.last_seq()) {
            Ok(changes) if changes.is_empty() => false,
            Ok(changes) => {
                let mut keys: Vec<&str> = changes.iter().map(|c| c.state_key.as_str()).collect();
                keys.dedup();
                debug!(?keys, "Settings changed in storage");
                self.refresh()
            }
            Err(e) => {
                warn!("Failed to poll for settings changes: {}", e);
                false
            }
        }
    }

    /// Forces a reload of both settings into the engine.
    ///
    /// On failure the engine keeps its previous snapshot. Returns true if the
    /// engine was updated.
    pub fn refresh(&self) -> bool {
        let _guard = self.refresh_lock.lock();

        // Read the sequence first so a write racing the load is seen next poll
        let seq = match self.db.latest_change_seq() {
            Ok(seq) => seq,
            Err(e) => {
                warn!("Failed to read settings change sequence: {}", e);
                return false;
            }
        };

        let settings = match self.db.load_settings() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, keeping previous snapshot: {}", e);
                return false;
            }
        };

        self.engine
            .replace_policy(PolicyList::from_patterns(&settings.force_list));
        self.engine.set_enabled(settings.enabled);
        self.last_seq.store(seq, Ordering::Relaxed);

        debug!(seq, patterns = settings.force_list.len(), enabled = settings.enabled, "Settings loaded");
        true
    }

    /// Creates a background polling task.
    ///
    /// Returns a future that should be spawned as a background task.
    pub fn start_polling(self: Arc<Self>) -> impl std::future::Future<Output = ()> + Send {
        let cache = self;
        async move {
            loop {
                tokio::time::sleep(cache.poll_interval).await;
                cache.poll();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use detour_core::ProxyPrefix;
    use detour_storage::FORCE_LIST_KEY;

    use super::*;

    fn setup(poll_interval: Duration) -> (Arc<Database>, Arc<RedirectEngine>, SettingsCache) {
        let db = Arc::new(Database::in_memory().unwrap());
        let engine = Arc::new(RedirectEngine::in_memory(ProxyPrefix::default()));
        let cache = SettingsCache::with_poll_interval(db.clone(), engine.clone(), poll_interval);
        (db, engine, cache)
    }

    #[test]
    fn test_refresh_loads_settings() {
        let (db, engine, cache) = setup(DEFAULT_POLL_INTERVAL);
        db.add_force_pattern("example.com").unwrap();
        db.set_enabled(false).unwrap();

        assert!(cache.refresh());

        assert_eq!(engine.policy().len(), 1);
        assert!(!engine.is_enabled());
        assert_eq!(cache.last_seq(), db.latest_change_seq().unwrap());
    }

    #[test]
    fn test_poll_picks_up_changes() {
        let (db, engine, cache) = setup(Duration::from_millis(1));
        cache.refresh();
        assert!(engine.policy().is_empty());

        db.add_force_pattern("example.com").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.poll());
        assert!(engine.policy().is_forced("https://example.com/"));

        std::thread::sleep(Duration::from_millis(5));
        assert!(!cache.poll());
    }

    #[test]
    fn test_poll_respects_interval() {
        let (db, _engine, cache) = setup(Duration::from_secs(3600));
        cache.refresh();

        db.set_enabled(false).unwrap();

        assert!(!cache.poll());
    }

    #[test]
    fn test_corrupt_settings_keep_previous_snapshot() {
        let (db, engine, cache) = setup(DEFAULT_POLL_INTERVAL);
        db.add_force_pattern("example.com").unwrap();
        cache.refresh();
        let seq = cache.last_seq();

        db.set_config(FORCE_LIST_KEY, &json!("not a list")).unwrap();

        assert!(!cache.refresh());
        assert!(engine.policy().is_forced("https://example.com/"));
        assert_eq!(cache.last_seq(), seq);
    }

    #[test]
    fn test_interleaved_refreshes_settle_on_latest() {
        let (db, engine, cache) = setup(DEFAULT_POLL_INTERVAL);
        let cache = Arc::new(cache);
        cache.refresh();

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let db = db.clone();
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        db.set_enabled((t + i) % 2 == 0).unwrap();
                        db.set_force_list(&[format!("site{t}-{i}.com")]).unwrap();
                        cache.refresh();
                    }
                })
            })
            .collect();

        let reader = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    cache.refresh();
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        // Whichever refresh ran last saw the final write
        let stored = db.load_settings().unwrap();
        assert_eq!(engine.is_enabled(), stored.enabled);
        assert_eq!(engine.policy().len(), 1);
        assert!(engine
            .policy()
            .is_forced(&format!("https://{}/", stored.force_list[0])));
        assert_eq!(cache.last_seq(), db.latest_change_seq().unwrap());
    }

    #[tokio::test]
    async fn test_start_polling_applies_changes() {
        let (db, engine, cache) = setup(Duration::from_millis(10));
        let cache = Arc::new(cache);
        cache.refresh();

        let handle = tokio::spawn(cache.clone().start_polling());
        db.set_enabled(false).unwrap();

        for _ in 0..100 {
            if !engine.is_enabled() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(!engine.is_enabled());
    }
}
