//! services/api/src/web/convert.rs
//!
//! Download endpoint that turns a stored (or inline) reviewer Markdown
//! document into a DOCX attachment.

use crate::convert::{markdown_to_docx, DOCX_MIME_TYPE};
use crate::error::ApiError;
use crate::web::file_stem;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json, Response},
};
use quickrev_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DownloadDocxRequest {
    /// Storage ID of the reviewer Markdown file. Used for the output name,
    /// and for the content when none is supplied inline.
    pub reviewer_file_id: Option<String>,
    /// Inline Markdown. Takes precedence over the stored content, so unsaved
    /// edits download as-is.
    pub content: Option<String>,
}

/// Convert a reviewer to DOCX and return it as an attachment.
#[utoipa::path(
    post,
    path = "/download/reviewer/docx",
    request_body = DownloadDocxRequest,
    responses(
        (status = 200, description = "The converted document, as an attachment"),
        (status = 400, description = "Neither a file ID nor inline content given"),
        (status = 404, description = "Reviewer file not found"),
        (status = 500, description = "Conversion failure")
    ),
    tag = "convert"
)]
pub async fn download_reviewer_docx_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DownloadDocxRequest>,
) -> Result<Response, ApiError> {
    // 1. Resolve the Markdown text and the output base name
    let (markdown, base_name) = match (&req.reviewer_file_id, req.content) {
        (Some(reviewer_file_id), content) => {
            let metadata = state
                .storage
                .get_file(reviewer_file_id)
                .await
                .map_err(map_missing_reviewer_file)?;
            let base_name = file_stem(&metadata.name).to_string();
            let markdown = match content {
                // Inline content wins; the stored blob is only fetched when
                // the client did not send its own copy.
                Some(content) => content,
                None => {
                    let bytes = state
                        .storage
                        .download(reviewer_file_id)
                        .await
                        .map_err(map_missing_reviewer_file)?;
                    String::from_utf8_lossy(&bytes).into_owned()
                }
            };
            (markdown, base_name)
        }
        (None, Some(content)) => (content, "reviewer".to_string()),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either reviewer_file_id or content must be provided.".to_string(),
            ));
        }
    };

    // 2. Perform the conversion
    let docx_bytes = markdown_to_docx(&markdown)
        .map_err(|e| ApiError::Internal(format!("Conversion failed: {}", e)))?;

    // 3. Force a download with the derived file name
    let headers = [
        (header::CONTENT_TYPE, DOCX_MIME_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.docx\"", base_name),
        ),
    ];
    Ok((headers, docx_bytes).into_response())
}

fn map_missing_reviewer_file(e: PortError) -> ApiError {
    match e {
        PortError::NotFound(_) => {
            ApiError::NotFound("Reviewer file not found in cloud storage.".to_string())
        }
        other => ApiError::Port(other),
    }
}
