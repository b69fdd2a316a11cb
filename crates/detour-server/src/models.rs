//! API request and response models.

use serde::{Deserialize, Serialize};

use detour_core::{EngineStats, RedirectAction, SessionId};
use detour_storage::ForceListEdit;

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether redirection is currently enabled.
    pub enabled: bool,
    /// Patterns in the engine's current snapshot.
    pub pattern_count: usize,
    pub proxy_prefix: String,
    pub stats: EngineStats,
}

/// Response body for the navigation endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// Redirect the host should apply, if any.
    pub redirect: Option<RedirectAction>,
}

/// Request body for POST /api/navigation/redirect-failed.
#[derive(Debug, Deserialize)]
pub struct RedirectFailedRequest {
    pub session_id: SessionId,
    /// Host error description.
    #[serde(default)]
    pub error: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Response body for GET /api/settings.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub enabled: bool,
    pub force_list: Vec<String>,
}

/// Request body for PUT /api/settings/enabled.
#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// Response body for PUT /api/settings/enabled.
#[derive(Debug, Serialize)]
pub struct SetEnabledResponse {
    pub enabled: bool,
}

/// Response body for GET/PUT /api/force-list.
#[derive(Debug, Serialize)]
pub struct ForceListResponse {
    pub patterns: Vec<String>,
}

/// Request body for POST /api/force-list and PUT /api/force-list/{index}.
#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    /// Raw user input; sanitized before storing.
    pub pattern: String,
}

/// Request body for PUT /api/force-list.
#[derive(Debug, Deserialize)]
pub struct ReplaceForceListRequest {
    pub patterns: Vec<String>,
}

/// Response body for single-pattern edits.
#[derive(Debug, Serialize)]
pub struct ForceListEditResponse {
    #[serde(flatten)]
    pub edit: ForceListEdit,
    /// The list after the edit.
    pub patterns: Vec<String>,
}

/// Response body for DELETE /api/force-list/{index}.
#[derive(Debug, Serialize)]
pub struct RemovePatternResponse {
    pub removed: String,
    /// The list after the removal.
    pub patterns: Vec<String>,
}
