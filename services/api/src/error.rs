//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use quickrev_core::ports::PortError;
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A request that cannot be served, with the exact message to return.
    #[error("{0}")]
    BadRequest(String),

    /// A lookup that found nothing, with the exact message to return.
    #[error("{0}")]
    NotFound(String),

    /// A request that failed session verification, with the exact message to
    /// return.
    #[error("{0}")]
    Unauthenticated(String),

    /// The uploaded or referenced document has an extension outside the
    /// supported set.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The model's flashcard response did not parse as the expected JSON array.
    #[error("LLM returned malformed JSON for flashcards.")]
    MalformedFlashcards,

    /// Represents an error while reading a multipart upload.
    #[error("Invalid multipart form data: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status and envelope message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::MalformedFlashcards => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Port(port_error) => match port_error {
                PortError::NotFound(_) => (StatusCode::NOT_FOUND, port_error.to_string()),
                PortError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                // Upstream 4xx means the request itself was bad; anything else
                // is the backend's problem.
                PortError::Upstream { status, message } if *status < 500 => {
                    (StatusCode::BAD_REQUEST, message.clone())
                }
                PortError::Upstream { .. } | PortError::Unexpected(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, port_error.to_string())
                }
            },
            ApiError::Config(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("Request failed ({}): {:?}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "message": message,
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_expected_statuses() {
        let cases = [
            (PortError::NotFound("file abc".into()), StatusCode::NOT_FOUND),
            (
                PortError::Unauthorized("No session".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                PortError::Upstream {
                    status: 409,
                    message: "already exists".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                PortError::Upstream {
                    status: 503,
                    message: "down".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PortError::Unexpected("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (port_error, expected) in cases {
            let (status, _) = ApiError::Port(port_error).status_and_message();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn malformed_flashcards_keeps_its_exact_message() {
        let (status, message) = ApiError::MalformedFlashcards.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "LLM returned malformed JSON for flashcards.");
    }

    #[test]
    fn unsupported_file_type_names_the_extension() {
        let (status, message) =
            ApiError::UnsupportedFileType("csv".into()).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Unsupported file type: csv");
    }

    #[test]
    fn unauthenticated_returns_401_with_the_given_message() {
        let (status, message) =
            ApiError::Unauthenticated("Not authenticated. Session cookie missing.".into())
                .status_and_message();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Not authenticated. Session cookie missing.");
    }
}
