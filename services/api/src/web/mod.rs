pub mod auth;
pub mod convert;
pub mod generate;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_session;
pub use rest::ApiDoc;

use crate::config::{AuthMode, Config};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub(crate) const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Builds the application router for the configured auth mode. Session mode
/// wraps the mutating routes in the session middleware; trusted mode leaves
/// them open and handlers require an explicit `user_id` instead.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(rest::welcome_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/cloud/file/view", get(rest::view_file_handler))
        .route("/cloud/file/associate", get(rest::associated_files_handler))
        .route(
            "/download/reviewer/docx",
            post(convert::download_reviewer_docx_handler),
        );

    let mut protected_routes = Router::new()
        .route("/cloud/file/upload", post(rest::upload_file_handler))
        .route("/cloud/file/list", get(rest::list_files_handler))
        .route("/cloud/file/update", put(rest::update_file_handler))
        .route("/generate/reviewer", post(generate::generate_reviewer_handler))
        .route(
            "/generate/flashcards",
            post(generate::generate_flashcards_handler),
        );

    if app_state.config.auth_mode == AuthMode::Session {
        protected_routes = protected_routes.layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::require_session,
        ));
    }

    let cors = cors_layer(&app_state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state)
}

// Credentials stay enabled so the browser sends the Appwrite session cookie
// cross-origin.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring malformed CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

// File names are handled as plain strings: everything after the last dot is
// the extension, everything before it the stem.

pub(crate) fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}

pub(crate) fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}
