//! Request authentication for the local API.
//!
//! The API listens on loopback, but any web page the user visits can reach
//! loopback too. Two checks keep pages out:
//!
//! - Requests that carry an `Origin` must come from a browser extension.
//!   Cross-origin reads from other origins are also blocked by CORS.
//! - Settings writes must present the [`ApiToken`] in the
//!   [`TOKEN_HEADER`] header. The token is generated at startup and handed
//!   to the extension out of band.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use crate::error::{ApiError, Result};

/// Header carrying the API token on settings writes.
pub const TOKEN_HEADER: &str = "x-detour-token";

/// Origin schemes of browser extensions.
const EXTENSION_SCHEMES: [&str; 2] = ["chrome-extension://", "moz-extension://"];

/// Shared secret required on settings writes.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Generates a random 256-bit token, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wraps an operator-supplied token.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares in constant time for equal lengths.
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.is_empty() || expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Fails with [`ApiError::Unauthorized`] unless the request carries this token.
    pub fn check(&self, headers: &HeaderMap) -> Result<()> {
        match headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
            Some(presented) if self.verify(presented) => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(..)")
    }
}

/// Returns true for `chrome-extension://` and `moz-extension://` origins.
pub fn is_extension_origin(origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .map(|origin| EXTENSION_SCHEMES.iter().any(|scheme| origin.starts_with(scheme)))
        .unwrap_or(false)
}

/// Middleware refusing requests whose `Origin` is not an extension.
///
/// Requests without an `Origin` (local tools, the settings CLI) pass.
pub async fn reject_foreign_origin(request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(axum::http::header::ORIGIN) {
        if !is_extension_origin(origin) {
            warn!(origin = ?origin, path = %request.uri().path(), "Refused request from foreign origin");
            return ApiError::ForeignOrigin.into_response();
        }
    }
    next.run(request).await
}
