//! Host navigation events and redirect actions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Browsing session (tab) identifier, stable for the session's lifetime.
pub type SessionId = i64;

/// Frame identifier within a session.
pub type FrameId = i64;

/// Frame id of a session's main document.
pub const TOP_LEVEL_FRAME: FrameId = 0;

/// Error code reported for loads aborted by the user or a new navigation.
///
/// Compared verbatim: a bare `"ABORTED"` or any other spelling is treated as
/// a genuine load failure and fails over to the proxy.
pub const ERR_ABORTED: &str = "net::ERR_ABORTED";

/// A navigation is about to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub session_id: SessionId,
    pub frame_id: FrameId,
    pub url: String,
}

impl NavigationEvent {
    /// Creates a top-level navigation event.
    pub fn top_level(session_id: SessionId, url: impl Into<String>) -> Self {
        Self {
            session_id,
            frame_id: TOP_LEVEL_FRAME,
            url: url.into(),
        }
    }

    /// Returns true if the event targets the main document.
    pub fn is_top_level(&self) -> bool {
        self.frame_id == TOP_LEVEL_FRAME
    }
}

/// A navigation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationErrorEvent {
    pub session_id: SessionId,
    pub frame_id: FrameId,
    pub url: String,
    /// Host error code, e.g. `net::ERR_CONNECTION_RESET`.
    pub error: String,
}

impl NavigationErrorEvent {
    /// Creates a top-level navigation error event.
    pub fn top_level(
        session_id: SessionId,
        url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            frame_id: TOP_LEVEL_FRAME,
            url: url.into(),
            error: error.into(),
        }
    }

    /// Returns true if the event targets the main document.
    pub fn is_top_level(&self) -> bool {
        self.frame_id == TOP_LEVEL_FRAME
    }

    /// Returns true if the load was cancelled locally rather than failing.
    pub fn is_aborted(&self) -> bool {
        self.error == ERR_ABORTED
    }
}

/// Why a redirect was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// A forced URL is sent through the proxy.
    EnterProxy,
    /// A proxied URL that is not forced is loaded directly.
    BypassProxy,
    /// A failed load is retried through the proxy.
    Failover,
}

impl RedirectReason {
    /// Returns the reason as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectReason::EnterProxy => "enter_proxy",
            RedirectReason::BypassProxy => "bypass_proxy",
            RedirectReason::Failover => "failover",
        }
    }
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to load `target_url` in the session's top-level frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectAction {
    pub session_id: SessionId,
    pub target_url: String,
    pub reason: RedirectReason,
}
