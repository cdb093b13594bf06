//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;
use quickrev_core::ports::PortError;

/// The identity resolved from a verified session, stored in request
/// extensions for handlers to pick up.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

/// Middleware that validates the Appwrite session cookie and resolves the
/// caller's user ID.
///
/// If valid, inserts an [`AuthUser`] into request extensions for handlers to
/// use. If invalid or missing, returns 401 Unauthorized.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract cookie header
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthenticated("Not authenticated. Session cookie missing.".to_string())
        })?;

    // 2. Parse the session secret out of the project-scoped cookie
    let cookie_prefix = format!("{}=", state.config.session_cookie_name());
    let session_secret = cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix(cookie_prefix.as_str()))
        .ok_or_else(|| {
            ApiError::Unauthenticated("Not authenticated. Session cookie missing.".to_string())
        })?;

    // 3. Resolve the session to an account ID
    let user_id = state
        .identity
        .verify_session(session_secret)
        .await
        .map_err(|e| {
            warn!("Session verification failed: {:?}", e);
            let message = match e {
                PortError::Unauthorized(message) => message,
                other => other.to_string(),
            };
            ApiError::Unauthenticated(format!("Authentication failed: {}", message))
        })?;

    // 4. Insert the identity into request extensions
    req.extensions_mut().insert(AuthUser(user_id));

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

/// The user ID a handler should act as. A verified session always wins over
/// a client-supplied ID; without one, the caller must say who they are.
pub fn effective_user_id(
    auth_user: Option<&AuthUser>,
    claimed_user_id: Option<&str>,
) -> Result<String, ApiError> {
    if let Some(AuthUser(id)) = auth_user {
        return Ok(id.clone());
    }
    match claimed_user_id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ApiError::BadRequest(
            "A user_id is required when no session is present.".to_string(),
        )),
    }
}
