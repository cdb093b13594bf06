//! services/api/src/web/auth.rs
//!
//! Session introspection endpoint. Sign-up and login live in the identity
//! provider; this service only ever checks who a session belongs to.

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::state::AppState;
use quickrev_core::ports::PortError;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: String,
    pub is_authenticated: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth/me - Resolve the session cookie to its account
///
/// Always verifies the cookie against the identity provider, regardless of
/// which auth mode the service runs in.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Session is valid", body = MeResponse),
        (status = 401, description = "Session cookie missing or invalid")
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Extract session cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthenticated("Not authenticated. Session cookie missing.".to_string())
        })?;

    // 2. Parse the session secret from the project-scoped cookie
    let cookie_prefix = format!("{}=", state.config.session_cookie_name());
    let session_secret = cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix(cookie_prefix.as_str()))
        .ok_or_else(|| {
            ApiError::Unauthenticated("Not authenticated. Session cookie missing.".to_string())
        })?;

    // 3. Ask the identity provider who owns it
    let user_id = state
        .identity
        .verify_session(session_secret)
        .await
        .map_err(|e| {
            warn!("Session check failed: {:?}", e);
            let message = match e {
                PortError::Unauthorized(message) => message,
                other => other.to_string(),
            };
            ApiError::Unauthenticated(format!("Authentication failed: {}", message))
        })?;

    Ok(Json(MeResponse {
        user_id,
        is_authenticated: true,
    }))
}
