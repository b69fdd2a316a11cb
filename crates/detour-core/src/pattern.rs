//! Force-list patterns.
//!
//! A pattern is either a host pattern (`example.com`, matches the host and
//! every subdomain) or a path pattern (`example.com/feed`, matches URLs whose
//! scheme-less form starts with the pattern at a path boundary). The kind is
//! decided once when the pattern is parsed.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Characters allowed to follow a path pattern in a matching URL.
const PATH_BOUNDARIES: [char; 3] = ['/', '?', '#'];

/// Kind of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Hostname with implicit subdomain matching.
    Host,
    /// Scheme-less URL prefix ending at a path boundary.
    Path,
}

impl PatternKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Host => "host",
            PatternKind::Path => "path",
        }
    }
}

/// A parsed force-list pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches `host == pattern` or `host` ending in `.pattern`.
    Host(String),
    /// Matches the scheme-less URL at a path boundary.
    Path(String),
}

impl Pattern {
    /// Parses a stored pattern string.
    ///
    /// The text is kept verbatim; stored patterns are already sanitized. Returns
    /// `None` for empty input so that an empty pattern can never match anything.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        if raw.contains('/') {
            Some(Pattern::Path(raw.to_string()))
        } else {
            Some(Pattern::Host(raw.to_string()))
        }
    }

    /// Returns the pattern text.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Host(p) | Pattern::Path(p) => p,
        }
    }

    /// Returns the pattern kind.
    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Host(_) => PatternKind::Host,
            Pattern::Path(_) => PatternKind::Path,
        }
    }

    /// Checks whether the target URL matches this pattern.
    pub fn matches(&self, target: &UrlTarget<'_>) -> bool {
        match self {
            Pattern::Host(p) => host_matches(target.host, p),
            Pattern::Path(p) => {
                path_matches(target.without_scheme, p)
                    || target
                        .without_scheme
                        .strip_prefix("www.")
                        .is_some_and(|rest| path_matches(rest, p))
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pattern::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty pattern"))
    }
}

/// The two views of a URL that patterns are matched against.
#[derive(Debug, Clone, Copy)]
pub struct UrlTarget<'a> {
    /// Parsed hostname.
    pub host: &'a str,
    /// The URL text with its `http://` or `https://` prefix removed.
    pub without_scheme: &'a str,
}

fn host_matches(host: &str, pattern: &str) -> bool {
    if host == pattern {
        return true;
    }
    host.strip_suffix(pattern)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(candidate: &str, pattern: &str) -> bool {
    match candidate.strip_prefix(pattern) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| PATH_BOUNDARIES.contains(&c)),
        None => false,
    }
}

/// Strips a leading `http://` or `https://`.
pub fn strip_scheme(url: &str) -> Option<&str> {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
}

/// Normalizes user input into a storable pattern.
///
/// Trims whitespace, removes an `http(s)://` scheme, a leading `www.` and a
/// single trailing `/`. Returns `None` when nothing is left.
///
/// # Examples
///
/// ```
/// use detour_core::pattern::sanitize_pattern;
///
/// assert_eq!(sanitize_pattern("https://www.linkedin.com/feed/"), Some("linkedin.com/feed".to_string()));
/// assert_eq!(sanitize_pattern("  example.com "), Some("example.com".to_string()));
/// assert_eq!(sanitize_pattern("https://"), None);
/// ```
pub fn sanitize_pattern(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let without_scheme = strip_scheme(trimmed).unwrap_or(trimmed);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let cleaned = without_www.strip_suffix('/').unwrap_or(without_www);

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
