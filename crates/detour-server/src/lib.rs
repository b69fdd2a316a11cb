//! Detour Server - local HTTP API.
//!
//! The browser-side shim forwards host navigation events here and applies the
//! redirect returned in the response. The same API edits the stored settings.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Liveness, enabled flag and decision counters
//! - `POST /api/navigation/start` - Navigation-start event, returns a redirect or null
//! - `POST /api/navigation/error` - Navigation-error event, returns a redirect or null
//! - `POST /api/navigation/redirect-failed` - The host could not apply a redirect
//! - `DELETE /api/sessions/{session_id}` - Session closed
//! - `GET /api/settings` - Enabled flag and force list
//! - `PUT /api/settings/enabled` - Toggle redirection
//! - `GET|POST|PUT /api/force-list` - Read, append to or replace the force list
//! - `PUT|DELETE /api/force-list/{index}` - Edit or remove one pattern
//!
//! Settings writes require the startup token in the `x-detour-token` header.
//! Requests with an `Origin` other than a browser extension are refused.
//!
//! ## Example
//!
//! ```no_run
//! use detour_server::{AppState, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::in_memory().unwrap();
//!     let server = Server::with_state(ServerConfig::default(), state).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod auth;
pub mod error;
mod handlers;
pub mod models;
pub mod state;
pub mod sync;

use std::net::SocketAddr;

use axum::http::{header, HeaderName, Method};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

pub use auth::{ApiToken, TOKEN_HEADER};
pub use error::{ApiError, Result};
pub use state::AppState;
pub use sync::{SettingsCache, DEFAULT_POLL_INTERVAL};

/// Default server port.
pub const DEFAULT_PORT: u16 = 48770;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48770).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// CORS for the browser-side shim: extension origins only.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _parts| {
            auth::is_extension_origin(origin)
        }))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(TOKEN_HEADER)])
}

/// Builds the API router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/navigation/start", post(handlers::navigation_start))
        .route("/api/navigation/error", post(handlers::navigation_error))
        .route(
            "/api/navigation/redirect-failed",
            post(handlers::redirect_failed),
        )
        .route("/api/sessions/{session_id}", delete(handlers::session_closed))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/settings/enabled", put(handlers::set_enabled))
        .route(
            "/api/force-list",
            get(handlers::get_force_list)
                .post(handlers::add_pattern)
                .put(handlers::replace_force_list),
        )
        .route(
            "/api/force-list/{index}",
            put(handlers::update_pattern).delete(handlers::remove_pattern),
        )
        .layer(middleware::from_fn(auth::reject_foreign_origin))
        .layer(cors_layer())
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Detour API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        // SO_REUSEADDR so a restart does not fail on lingering TIME_WAIT sockets
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }
}
