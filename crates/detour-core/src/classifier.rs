//! URL classifier.
//!
//! Decides whether a URL is forced through the proxy by a policy list.
//! Classification never fails: anything that is not an absolute `http(s)`
//! URL with a hostname is simply not forced.

use tracing::{debug, trace};
use url::Url;

use crate::pattern::{strip_scheme, Pattern, UrlTarget};
use crate::policy::PolicyList;

/// Outcome of classifying a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// The URL matched this pattern (first match in list order).
    Forced(&'a Pattern),
    /// Valid URL, no pattern matched.
    NotForced,
    /// Empty, non-http(s) or unparseable input.
    Invalid,
}

impl Classification<'_> {
    /// Returns true if the URL must use the proxied path.
    pub fn is_forced(&self) -> bool {
        matches!(self, Classification::Forced(_))
    }
}

/// Returns true if the string starts with `http://` or `https://`.
pub fn is_http_url(url: &str) -> bool {
    strip_scheme(url).is_some()
}

/// Classifies a URL against a policy list.
pub fn classify<'a>(url: &str, policy: &'a PolicyList) -> Classification<'a> {
    let Some(without_scheme) = strip_scheme(url) else {
        return Classification::Invalid;
    };

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(url, error = %e, "Failed to parse URL for classification");
            return Classification::Invalid;
        }
    };

    let Some(host) = parsed.host_str() else {
        debug!(url, "URL has no host");
        return Classification::Invalid;
    };

    let target = UrlTarget {
        host,
        without_scheme,
    };

    match policy.iter().find(|pattern| pattern.matches(&target)) {
        Some(pattern) => {
            trace!(url, pattern = %pattern, kind = pattern.kind().as_str(), "URL matched force list");
            Classification::Forced(pattern)
        }
        None => Classification::NotForced,
    }
}

/// Returns true if the URL is forced through the proxy by the policy list.
///
/// # Examples
///
/// ```
/// use detour_core::{is_forced, PolicyList};
///
/// let policy = PolicyList::from_patterns(["example.com", "linkedin.com/feed"]);
///
/// assert!(is_forced("https://www.example.com/page", &policy));
/// assert!(is_forced("https://linkedin.com/feed?x=1", &policy));
/// assert!(!is_forced("https://linkedin.com/feedback", &policy));
/// assert!(!is_forced("ftp://example.com", &policy));
/// ```
pub fn is_forced(url: &str, policy: &PolicyList) -> bool {
    classify(url, policy).is_forced()
}
