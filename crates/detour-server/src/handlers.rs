//! API route handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{debug, info};

use detour_core::{NavigationErrorEvent, NavigationEvent, SessionId};

use crate::error::Result;
use crate::models::{
    AckResponse, ForceListEditResponse, ForceListResponse, HealthResponse, NavigationResponse,
    PatternRequest, RedirectFailedRequest, RemovePatternResponse, ReplaceForceListRequest,
    SetEnabledRequest, SetEnabledResponse, SettingsResponse,
};
use crate::state::AppState;

/// GET /api/health - Liveness and engine summary.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        enabled: state.engine.is_enabled(),
        pattern_count: state.engine.policy().len(),
        proxy_prefix: state.engine.prefix().to_string(),
        stats: state.engine.stats(),
    })
}

// ==================== Navigation Events ====================

/// POST /api/navigation/start - Decide a redirect for a navigation.
pub async fn navigation_start(
    State(state): State<AppState>,
    Json(event): Json<NavigationEvent>,
) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        redirect: state.engine.on_navigation_start(&event),
    })
}

/// POST /api/navigation/error - Decide a failover for a failed navigation.
pub async fn navigation_error(
    State(state): State<AppState>,
    Json(event): Json<NavigationErrorEvent>,
) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        redirect: state.engine.on_navigation_error(&event),
    })
}

/// POST /api/navigation/redirect-failed - The host could not apply a redirect.
pub async fn redirect_failed(
    State(state): State<AppState>,
    Json(req): Json<RedirectFailedRequest>,
) -> Json<AckResponse> {
    state.engine.on_redirect_failed(req.session_id, &req.error);
    Json(AckResponse::ok())
}

/// DELETE /api/sessions/{session_id} - A session was closed.
pub async fn session_closed(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Json<AckResponse> {
    debug!(session_id, "Session closed");
    state.engine.on_session_closed(session_id);
    Json(AckResponse::ok())
}

// ==================== Settings ====================
//
// Every write checks the API token before touching storage.

/// GET /api/settings - Stored settings.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>> {
    let settings = state.db.load_settings()?;
    Ok(Json(SettingsResponse {
        enabled: settings.enabled,
        force_list: settings.force_list,
    }))
}

/// PUT /api/settings/enabled - Toggle redirection.
pub async fn set_enabled(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetEnabledRequest>,
) -> Result<Json<SetEnabledResponse>> {
    state.api_token.check(&headers)?;
    state.db.set_enabled(req.enabled)?;
    state.settings.refresh();

    info!(enabled = req.enabled, "Enabled flag updated via API");
    Ok(Json(SetEnabledResponse {
        enabled: req.enabled,
    }))
}

// ==================== Force List ====================

/// GET /api/force-list - Stored patterns in order.
pub async fn get_force_list(State(state): State<AppState>) -> Result<Json<ForceListResponse>> {
    Ok(Json(ForceListResponse {
        patterns: state.db.get_force_list()?,
    }))
}

/// POST /api/force-list - Append a pattern.
pub async fn add_pattern(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PatternRequest>,
) -> Result<Json<ForceListEditResponse>> {
    state.api_token.check(&headers)?;
    let edit = state.db.add_force_pattern(&req.pattern)?;
    if edit.is_change() {
        state.settings.refresh();
        info!(?edit, "Force list pattern added");
    } else {
        debug!(?edit, input = %req.pattern, "Force list add not applied");
    }

    Ok(Json(ForceListEditResponse {
        edit,
        patterns: state.db.get_force_list()?,
    }))
}

/// PUT /api/force-list - Replace the whole list.
pub async fn replace_force_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReplaceForceListRequest>,
) -> Result<Json<ForceListResponse>> {
    state.api_token.check(&headers)?;
    let patterns = state.db.set_force_list(&req.patterns)?;
    state.settings.refresh();

    info!(count = patterns.len(), "Force list replaced via API");
    Ok(Json(ForceListResponse { patterns }))
}

/// PUT /api/force-list/{index} - Edit a pattern in place.
pub async fn update_pattern(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    headers: HeaderMap,
    Json(req): Json<PatternRequest>,
) -> Result<Json<ForceListEditResponse>> {
    state.api_token.check(&headers)?;
    let edit = state.db.update_force_pattern(index, &req.pattern)?;
    if edit.is_change() {
        state.settings.refresh();
        info!(?edit, "Force list pattern updated");
    } else {
        debug!(?edit, index, input = %req.pattern, "Force list update not applied");
    }

    Ok(Json(ForceListEditResponse {
        edit,
        patterns: state.db.get_force_list()?,
    }))
}

/// DELETE /api/force-list/{index} - Remove a pattern.
pub async fn remove_pattern(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    headers: HeaderMap,
) -> Result<Json<RemovePatternResponse>> {
    state.api_token.check(&headers)?;
    let removed = state.db.remove_force_pattern(index)?;
    state.settings.refresh();

    info!(pattern = %removed, "Force list pattern removed");
    Ok(Json(RemovePatternResponse {
        removed,
        patterns: state.db.get_force_list()?,
    }))
}
