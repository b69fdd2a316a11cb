//! Detour Core - URL classification and redirect decisions.
//!
//! This crate decides, for each navigation of a browsing session, whether it
//! should load through the security proxy, bypass it, or be left alone.
//!
//! ## Architecture
//!
//! ```text
//! Host event → RedirectEngine → MarkerStore (loop guard)
//!                    │
//!                    ▼
//!              classify(url, PolicyList) → RedirectAction / no-op
//! ```
//!
//! - [`pattern`]: host and path patterns, input sanitizing
//! - [`classifier`]: `is_forced` over a policy list
//! - [`policy`]: immutable policy lists and the copy-on-write cell
//! - [`loop_guard`]: one-shot per-session redirect markers
//! - [`engine`]: the per-event decision state machine
//!
//! # Example
//!
//! ```
//! use detour_core::{NavigationEvent, PolicyList, ProxyPrefix, RedirectEngine};
//!
//! let engine = RedirectEngine::in_memory(ProxyPrefix::default())
//!     .with_policy(PolicyList::from_patterns(["example.com"]));
//!
//! let action = engine
//!     .on_navigation_start(&NavigationEvent::top_level(1, "https://example.com/page"))
//!     .unwrap();
//! assert_eq!(action.target_url, "https://safe.menlosecurity.com/https://example.com/page");
//!
//! // The redirect's own navigation is let through.
//! assert!(engine
//!     .on_navigation_start(&NavigationEvent::top_level(1, &action.target_url))
//!     .is_none());
//! ```

pub mod classifier;
pub mod engine;
pub mod error;
pub mod event;
pub mod loop_guard;
pub mod pattern;
pub mod policy;
pub mod prefix;

pub use classifier::{classify, is_forced, is_http_url, Classification};
pub use engine::{EngineStats, RedirectEngine};
pub use error::{CoreError, MarkerError, Result};
pub use event::{
    FrameId, NavigationErrorEvent, NavigationEvent, RedirectAction, RedirectReason, SessionId,
    ERR_ABORTED, TOP_LEVEL_FRAME,
};
pub use loop_guard::{LoopGuard, MarkerResult, MarkerStore};
pub use pattern::{sanitize_pattern, Pattern, PatternKind};
pub use policy::{PolicyCell, PolicyList};
pub use prefix::{ProxyPrefix, Wrapped, DEFAULT_PROXY_PREFIX};
