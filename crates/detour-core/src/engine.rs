//! Redirect decision engine.
//!
//! Consumes host navigation events and decides whether the session should
//! be redirected into or out of the security proxy. Each event produces at
//! most one [`RedirectAction`]; errors never propagate out of the engine and
//! degrade to "no redirect".
//!
//! ## Navigation start
//!
//! ```text
//! top-level & enabled? ── no ──▶ no-op
//!        │ yes
//! marker pending? ── yes ──▶ consume, no-op
//!        │ no
//! proxied URL? ── internal page ──▶ no-op
//!        │             └─ wrapped site ── forced? ── yes ──▶ no-op
//!        │                                   └─ no ──▶ mark, redirect to site
//!        └ direct ── forced? ── yes ──▶ mark, redirect to prefix + url
//!                       └─ no ──▶ no-op
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{classify, is_http_url, Classification};
use crate::event::{
    NavigationErrorEvent, NavigationEvent, RedirectAction, RedirectReason, SessionId,
};
use crate::loop_guard::{LoopGuard, MarkerStore};
use crate::policy::{PolicyCell, PolicyList};
use crate::prefix::{ProxyPrefix, Wrapped};

/// Counters describing the engine's decisions since start.
#[derive(Debug, Default)]
struct Counters {
    entered: AtomicU64,
    bypassed: AtomicU64,
    failovers: AtomicU64,
    suppressed: AtomicU64,
}

/// Snapshot of decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Redirects into the proxy for forced URLs.
    pub entered: u64,
    /// Redirects out of the proxy for URLs that are not forced.
    pub bypassed: u64,
    /// Redirects into the proxy after a failed load.
    pub failovers: u64,
    /// Navigations let through because of a pending marker.
    pub suppressed: u64,
}

/// Decides redirects for navigation events.
pub struct RedirectEngine {
    prefix: ProxyPrefix,
    policy: PolicyCell,
    enabled: AtomicBool,
    markers: Arc<dyn MarkerStore>,
    counters: Counters,
}

impl std::fmt::Debug for RedirectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectEngine")
            .field("prefix", &self.prefix.as_str())
            .field("patterns", &self.policy.snapshot().len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl RedirectEngine {
    /// Creates an enabled engine with an empty policy list.
    pub fn new(prefix: ProxyPrefix, markers: Arc<dyn MarkerStore>) -> Self {
        Self {
            prefix,
            policy: PolicyCell::default(),
            enabled: AtomicBool::new(true),
            markers,
            counters: Counters::default(),
        }
    }

    /// Creates an engine backed by an in-memory [`LoopGuard`].
    pub fn in_memory(prefix: ProxyPrefix) -> Self {
        Self::new(prefix, Arc::new(LoopGuard::new()))
    }

    /// Sets the initial policy list.
    pub fn with_policy(self, policy: PolicyList) -> Self {
        self.policy.replace(policy);
        self
    }

    /// Sets the initial enabled flag.
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Returns the proxy prefix.
    pub fn prefix(&self) -> &ProxyPrefix {
        &self.prefix
    }

    /// Returns the current policy snapshot.
    pub fn policy(&self) -> Arc<PolicyList> {
        self.policy.snapshot()
    }

    /// Swaps in a new policy list; takes effect for the next event.
    pub fn replace_policy(&self, policy: PolicyList) {
        let count = policy.len();
        let previous = self.policy.replace(policy);
        if previous.len() != count {
            info!(from = previous.len(), to = count, "Force list updated");
        } else {
            debug!(patterns = count, "Force list reloaded");
        }
    }

    /// Returns whether the engine acts on events.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enables or disables redirection; takes effect for the next event.
    pub fn set_enabled(&self, enabled: bool) {
        let old = self.enabled.swap(enabled, Ordering::SeqCst);
        if old != enabled {
            info!("Redirection enabled {} -> {}", old, enabled);
        }
    }

    /// Returns the decision counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entered: self.counters.entered.load(Ordering::Relaxed),
            bypassed: self.counters.bypassed.load(Ordering::Relaxed),
            failovers: self.counters.failovers.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
        }
    }

    /// Handles a navigation-start event.
    pub fn on_navigation_start(&self, event: &NavigationEvent) -> Option<RedirectAction> {
        if !event.is_top_level() || !self.is_enabled() {
            return None;
        }

        let session_id = event.session_id;
        match self.markers.consume(session_id) {
            Ok(true) => {
                debug!(session_id, url = %event.url, "Redirect completed, skipping evaluation");
                self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(session_id, error = %e, "Failed to read redirect marker, ignoring navigation");
                return None;
            }
        }

        let policy = self.policy.snapshot();

        match self.prefix.unwrap(&event.url) {
            Wrapped::Internal => {
                debug!(session_id, url = %event.url, "Internal proxy page");
                None
            }
            Wrapped::Site(original) => match classify(original, &policy) {
                Classification::Forced(pattern) => {
                    debug!(session_id, url = original, pattern = %pattern, "Forced URL, staying on proxy");
                    None
                }
                Classification::NotForced => {
                    self.redirect(session_id, original.to_string(), RedirectReason::BypassProxy)
                }
                Classification::Invalid => {
                    debug!(session_id, url = original, "Unparseable proxied URL, staying on proxy");
                    None
                }
            },
            Wrapped::Direct => match classify(&event.url, &policy) {
                Classification::Forced(pattern) => {
                    debug!(session_id, url = %event.url, pattern = %pattern, "URL matched force list");
                    self.redirect(
                        session_id,
                        self.prefix.wrap(&event.url),
                        RedirectReason::EnterProxy,
                    )
                }
                Classification::NotForced | Classification::Invalid => None,
            },
        }
    }

    /// Handles a navigation-error event by failing over to the proxy.
    pub fn on_navigation_error(&self, event: &NavigationErrorEvent) -> Option<RedirectAction> {
        if !event.is_top_level()
            || !self.is_enabled()
            || !is_http_url(&event.url)
            || self.prefix.is_proxied(&event.url)
            || event.is_aborted()
        {
            return None;
        }

        debug!(session_id = event.session_id, url = %event.url, error = %event.error, "Navigation failed");
        self.redirect(
            event.session_id,
            self.prefix.wrap(&event.url),
            RedirectReason::Failover,
        )
    }

    /// Handles session termination. Runs even when the engine is disabled.
    pub fn on_session_closed(&self, session_id: SessionId) {
        if let Err(e) = self.markers.clear(session_id) {
            warn!(session_id, error = %e, "Failed to clear redirect marker");
        }
    }

    /// Handles a redirect the host could not apply.
    ///
    /// The pending marker belongs to a navigation that will never happen, so
    /// it is cleared; the next navigation is evaluated normally.
    pub fn on_redirect_failed(&self, session_id: SessionId, error: &str) {
        warn!(session_id, error, "Host failed to apply redirect");
        if let Err(e) = self.markers.clear(session_id) {
            warn!(session_id, error = %e, "Failed to clear redirect marker");
        }
    }

    fn redirect(
        &self,
        session_id: SessionId,
        target_url: String,
        reason: RedirectReason,
    ) -> Option<RedirectAction> {
        if let Err(e) = self.markers.mark(session_id) {
            warn!(session_id, error = %e, "Failed to set redirect marker, not redirecting");
            return None;
        }

        let counter = match reason {
            RedirectReason::EnterProxy => &self.counters.entered,
            RedirectReason::BypassProxy => &self.counters.bypassed,
            RedirectReason::Failover => &self.counters.failovers,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        info!(session_id, target = %target_url, %reason, "Redirecting");
        Some(RedirectAction {
            session_id,
            target_url,
            reason,
        })
    }
}
