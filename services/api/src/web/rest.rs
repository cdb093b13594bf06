//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the cloud file endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::middleware::{effective_user_id, AuthUser};
use crate::web::state::AppState;
use crate::web::{file_stem, DEFAULT_MIME_TYPE};
use axum::{
    extract::{Extension, Multipart, Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use quickrev_core::domain::{unique_id, FileKind, NewFileRecord, UnknownFileKind};
use quickrev_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        welcome_handler,
        upload_file_handler,
        list_files_handler,
        view_file_handler,
        associated_files_handler,
        update_file_handler,
        crate::web::generate::generate_reviewer_handler,
        crate::web::generate::generate_flashcards_handler,
        crate::web::convert::download_reviewer_docx_handler,
        crate::web::auth::me_handler,
    ),
    components(
        schemas(
            UploadFileResponse,
            ListedFile,
            FileListResponse,
            AssociatedFile,
            AssociationResponse,
            UpdateFileRequest,
            UpdateFileResponse,
            crate::web::generate::GenerateReviewerRequest,
            crate::web::generate::GenerateReviewerResponse,
            crate::web::generate::GenerateFlashcardsRequest,
            crate::web::generate::GenerateFlashcardsResponse,
            crate::web::convert::DownloadDocxRequest,
            crate::web::auth::MeResponse,
        )
    ),
    tags(
        (name = "QuickRev File API", description = "File storage, conversion and study-artifact generation.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The response payload sent after successfully uploading a file.
#[derive(Serialize, ToSchema)]
pub struct UploadFileResponse {
    pub success: bool,
    pub message: String,
    pub file_id: String,
    pub file_name: String,
}

/// One file in a listing, shaped for the frontend's library view.
#[derive(Serialize, ToSchema)]
pub struct ListedFile {
    pub name: String,
    pub file_id: String,
    pub updated_at: DateTime<Utc>,
    pub document_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<ListedFile>,
}

/// One derived file in an association listing. Carries the artifact type so
/// the frontend can tell reviewers from flashcards.
#[derive(Serialize, ToSchema)]
pub struct AssociatedFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub file_id: String,
    pub updated_at: DateTime<Utc>,
    pub document_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct AssociationResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<AssociatedFile>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateFileRequest {
    /// Storage ID of the blob whose content is being replaced.
    pub file_id: String,
    /// The full new content.
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateFileResponse {
    pub success: bool,
    pub message: String,
    /// Storage ID of the replacement blob.
    pub file_id: String,
    /// Catalog record that now points at the replacement.
    pub document_id: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ListFilesParams {
    /// The ID of the user whose files to retrieve.
    pub user_id: Option<String>,
    /// The type of file to filter by (default: original).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ViewFileParams {
    /// The storage ID of the file to view.
    pub file_id: String,
}

#[derive(Deserialize, IntoParams)]
pub struct AssociationParams {
    /// The storage ID of the original file (the source).
    pub source_file_id: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Welcome message.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up")),
    tag = "meta"
)]
pub async fn welcome_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to QuickRev File API" }))
}

/// Upload a document.
///
/// Accepts a multipart/form-data request with a `file` part and, when no
/// session is present, a `user_id` text field. The blob is stored with
/// owner permissions and a catalog record of type `original` is created
/// pointing at it.
#[utoipa::path(
    post,
    path = "/cloud/file/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 200, description = "File stored and catalogued", body = UploadFileResponse),
        (status = 400, description = "Missing file part or user identity"),
        (status = 401, description = "Session required but missing or invalid"),
        (status = 500, description = "Cloud backend failure")
    ),
    tag = "cloud"
)]
pub async fn upload_file_handler(
    State(state): State<Arc<AppState>>,
    auth_user: Option<Extension<AuthUser>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Pull the file part and the optional user_id field out of the form
    let mut file_part: Option<(String, String, Bytes)> = None;
    let mut claimed_user_id: Option<String> = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("untitled.txt").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let content = field.bytes().await?;
                file_part = Some((file_name, mime_type, content));
            }
            Some("user_id") => {
                claimed_user_id = Some(field.text().await?);
            }
            _ => {}
        }
    }
    let (file_name, mime_type, content) = file_part.ok_or_else(|| {
        ApiError::BadRequest("Multipart form must include a file".to_string())
    })?;
    let user_id = effective_user_id(
        auth_user.as_ref().map(|Extension(user)| user),
        claimed_user_id.as_deref(),
    )?;

    // 2. Upload the blob to storage under a fresh ID, owned by the user
    let new_file_id = unique_id();
    state
        .storage
        .create_file(&new_file_id, &file_name, &mime_type, content, &user_id)
        .await?;

    // 3. Log the metadata record used by the listing endpoints
    state
        .catalog
        .create_record(NewFileRecord {
            user_id: user_id.clone(),
            kind: FileKind::Original,
            name: file_stem(&file_name).to_string(),
            file_id: new_file_id.clone(),
            // The source is itself.
            source_file_id: new_file_id.clone(),
        })
        .await?;

    info!("Stored upload '{}' as file {} for user {}", file_name, new_file_id, user_id);

    // 4. Return success
    Ok(Json(UploadFileResponse {
        success: true,
        message: "File uploaded successfully and ready for processing.".to_string(),
        file_id: new_file_id,
        file_name,
    }))
}

/// List a user's files of one type, newest first.
#[utoipa::path(
    get,
    path = "/cloud/file/list",
    params(ListFilesParams),
    responses(
        (status = 200, description = "Matching catalog records", body = FileListResponse),
        (status = 400, description = "Unknown file type or missing user identity"),
        (status = 401, description = "Session required but missing or invalid")
    ),
    tag = "cloud"
)]
pub async fn list_files_handler(
    State(state): State<Arc<AppState>>,
    auth_user: Option<Extension<AuthUser>>,
    Query(params): Query<ListFilesParams>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Resolve who we are listing for and which artifact type
    let user_id = effective_user_id(
        auth_user.as_ref().map(|Extension(user)| user),
        params.user_id.as_deref(),
    )?;
    let kind: FileKind = params
        .kind
        .as_deref()
        .unwrap_or("original")
        .parse()
        .map_err(|e: UnknownFileKind| ApiError::BadRequest(e.to_string()))?;

    // 2. Fetch the matching catalog records
    let records = state.catalog.list_by_user(&user_id, kind).await?;

    // 3. Shape the listing for the frontend
    let files: Vec<ListedFile> = records
        .into_iter()
        .map(|record| ListedFile {
            name: record.name,
            file_id: record.file_id,
            updated_at: record.updated_at,
            document_id: record.id,
        })
        .collect();

    Ok(Json(FileListResponse {
        success: true,
        message: format!(
            "Successfully retrieved {} files of type '{}' for user {}.",
            files.len(),
            kind.as_str(),
            user_id
        ),
        files,
    }))
}

/// Serve a stored file inline.
///
/// Returns the blob bytes with the stored MIME type and long-lived caching
/// headers, for direct embedding by the frontend.
#[utoipa::path(
    get,
    path = "/cloud/file/view",
    params(ViewFileParams),
    responses(
        (status = 200, description = "The file bytes, served inline"),
        (status = 404, description = "No file with that ID in storage")
    ),
    tag = "cloud"
)]
pub async fn view_file_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewFileParams>,
) -> Result<Response, ApiError> {
    let file_id = params.file_id;

    // 1. Metadata first: the content type is what lets the browser render it
    let metadata = state
        .storage
        .get_file(&file_id)
        .await
        .map_err(|e| map_missing_stored_file(e, &file_id))?;

    // 2. Fetch the bytes
    let content = state
        .storage
        .view(&file_id)
        .await
        .map_err(|e| map_missing_stored_file(e, &file_id))?;

    // 3. Serve inline; no Content-Disposition so the browser displays it
    let headers = [
        (header::CONTENT_TYPE, metadata.mime_type),
        (header::CONTENT_LENGTH, content.len().to_string()),
        (
            header::CACHE_CONTROL,
            "public, max-age=31536000".to_string(),
        ),
    ];
    Ok((headers, content).into_response())
}

fn map_missing_stored_file(e: PortError, file_id: &str) -> ApiError {
    match e {
        PortError::NotFound(_) => ApiError::NotFound(format!(
            "The requested file (ID: {}) was not found in storage.",
            file_id
        )),
        other => ApiError::Port(other),
    }
}

/// List the artifacts derived from one original file.
///
/// Excludes the original itself, which points at its own file ID.
#[utoipa::path(
    get,
    path = "/cloud/file/associate",
    params(AssociationParams),
    responses(
        (status = 200, description = "Derived records, newest first", body = AssociationResponse)
    ),
    tag = "cloud"
)]
pub async fn associated_files_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AssociationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let source_file_id = params.source_file_id;

    let records = state.catalog.list_derived(&source_file_id).await?;

    let files: Vec<AssociatedFile> = records
        .into_iter()
        .map(|record| AssociatedFile {
            kind: record.kind.as_str().to_string(),
            name: record.name,
            file_id: record.file_id,
            updated_at: record.updated_at,
            document_id: record.id,
        })
        .collect();

    Ok(Json(AssociationResponse {
        success: true,
        message: format!(
            "Successfully retrieved {} associated files for source ID {}.",
            files.len(),
            source_file_id
        ),
        files,
    }))
}

/// Replace a file's content.
///
/// The existing catalog record is repointed at a replacement blob uploaded
/// under a fresh ID; the old blob is left in place. Blob and record writes
/// are not transactional, so a failure between the two leaves the record on
/// the old content.
#[utoipa::path(
    put,
    path = "/cloud/file/update",
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Record repointed at the new content", body = UpdateFileResponse),
        (status = 404, description = "No catalog record for that file ID"),
        (status = 401, description = "Session required but missing or invalid")
    ),
    tag = "cloud"
)]
pub async fn update_file_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Locate the catalog record for this blob
    let record = state
        .catalog
        .find_by_file_id(&req.file_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound(format!(
                "No file record found for file ID {}.",
                req.file_id
            )),
            other => ApiError::Port(other),
        })?;

    // 2. Reuse the old blob's display name and MIME type
    let stored = state.storage.get_file(&req.file_id).await?;

    // 3. Upload the replacement under a fresh ID, owned by the record's user
    let new_file_id = unique_id();
    state
        .storage
        .create_file(
            &new_file_id,
            &stored.name,
            &stored.mime_type,
            Bytes::from(req.content),
            &record.user_id,
        )
        .await?;

    // 4. Point the record at the replacement
    let updated = state.catalog.repoint_record(&record.id, &new_file_id).await?;

    info!(
        "Repointed record {} from file {} to file {}",
        updated.id, req.file_id, new_file_id
    );

    Ok(Json(UpdateFileResponse {
        success: true,
        message: "File content updated successfully.".to_string(),
        file_id: new_file_id,
        document_id: updated.id,
    }))
}
