use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};

use service::settings::SettingsMap;

use crate::errors::ApiError;
use crate::identity::AuthUser;
use crate::state::AppState;

/// The caller's own stored settings, without admin fallback.
pub async fn get_settings(State(state): State<AppState>, AuthUser(requester): AuthUser) -> Result<Json<SettingsMap>, ApiError> {
    Ok(Json(state.settings.own_settings(&requester).await?))
}

/// Upsert a flat object of scalar values. Entries failing the allow-list are dropped silently.
pub async fn post_settings(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(raw): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    state.settings.update(&requester, &raw).await?;
    Ok(Json(json!({"ok": true})))
}
