//! Security-proxy URL prefix.

use std::fmt;

use crate::classifier::is_http_url;
use crate::error::{CoreError, Result};

/// Prefix of the security proxy's serving namespace.
pub const DEFAULT_PROXY_PREFIX: &str = "https://safe.menlosecurity.com/";

/// How a navigation target relates to the proxy prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapped<'a> {
    /// Not under the proxy prefix.
    Direct,
    /// A proxied site; holds the original URL after the prefix.
    Site(&'a str),
    /// An internal proxy page (suffix is not an absolute http(s) URL).
    Internal,
}

/// Validated proxy prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPrefix(String);

impl ProxyPrefix {
    /// Creates a prefix, checking that it is an absolute http(s) URL ending in `/`.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if !is_http_url(&prefix) || !prefix.ends_with('/') || url::Url::parse(&prefix).is_err() {
            return Err(CoreError::InvalidPrefix(prefix));
        }
        Ok(Self(prefix))
    }

    /// Returns the prefix string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the URL is under the proxy prefix.
    pub fn is_proxied(&self, url: &str) -> bool {
        url.starts_with(&self.0)
    }

    /// Wraps a URL so it loads through the proxy.
    pub fn wrap(&self, url: &str) -> String {
        format!("{}{}", self.0, url)
    }

    /// Splits a URL into its relation with the proxy prefix.
    pub fn unwrap<'a>(&self, url: &'a str) -> Wrapped<'a> {
        match url.strip_prefix(self.0.as_str()) {
            None => Wrapped::Direct,
            Some(suffix) if is_http_url(suffix) => Wrapped::Site(suffix),
            Some(_) => Wrapped::Internal,
        }
    }
}

impl Default for ProxyPrefix {
    fn default() -> Self {
        Self(DEFAULT_PROXY_PREFIX.to_string())
    }
}

impl fmt::Display for ProxyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProxyPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
