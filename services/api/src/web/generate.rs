//! services/api/src/web/generate.rs
//!
//! The study-artifact pipelines: download a stored document, extract and
//! clean its text, run the relevant prompt, and store the result as a new
//! derived file.

use crate::convert::{extract_text, write_temp, SourceFormat};
use crate::error::ApiError;
use crate::generator;
use crate::web::middleware::{effective_user_id, AuthUser};
use crate::web::state::AppState;
use crate::web::{file_extension, file_stem};
use axum::{
    extract::{Extension, Form, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use quickrev_core::domain::{
    sort_flashcards, unique_id, FileKind, Flashcard, FlashcardPlan, NewFileRecord,
};
use quickrev_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateReviewerRequest {
    /// Storage ID of the source document.
    pub file_id: String,
    /// Required only when no session is present.
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateReviewerResponse {
    pub success: bool,
    pub message: String,
    /// Storage ID of the generated Markdown reviewer.
    pub file_id: String,
}

fn default_count() -> i64 {
    10
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateFlashcardsRequest {
    /// Storage ID of the source document.
    pub file_id: String,
    /// Required only when no session is present.
    pub user_id: Option<String>,
    #[serde(default = "default_count")]
    pub multiple_choice: i64,
    #[serde(default = "default_count")]
    pub identification: i64,
    #[serde(default = "default_count")]
    pub true_or_false: i64,
    #[serde(default = "default_count")]
    pub enumeration: i64,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateFlashcardsResponse {
    pub success: bool,
    pub message: String,
    /// Storage ID of the generated JSON blob; null when generation was skipped.
    pub file_id: Option<String>,
    /// The generated cards, sorted by type.
    #[schema(value_type = Vec<Object>)]
    pub flashcards: Vec<Flashcard>,
}

//=========================================================================================
// Shared Pipeline Steps
//=========================================================================================

/// Fetches a stored document and turns it into cleaned plain text. The
/// extension check runs before the download so unsupported types never cost
/// a transfer.
async fn fetch_clean_text(
    state: &AppState,
    file_id: &str,
) -> Result<(String, quickrev_core::domain::StoredFileInfo), ApiError> {
    // 1. Get file metadata from storage
    let metadata = state
        .storage
        .get_file(file_id)
        .await
        .map_err(map_missing_source_file)?;

    // 2. The extension decides the converter; reject before downloading
    let extension = file_extension(&metadata.name).unwrap_or_default();
    let format = SourceFormat::from_extension(&extension)
        .ok_or_else(|| ApiError::UnsupportedFileType(extension.clone()))?;

    // 3. Download the original bytes
    let content = state
        .storage
        .download(file_id)
        .await
        .map_err(map_missing_source_file)?;

    // 4. Extract text through a temp file; the guard deletes it on return
    let temp_path = write_temp(file_id, &extension, &content)?;
    let extraction = extract_text(&temp_path, format);
    if let Some(warning) = &extraction.warning {
        warn!("Partial extraction for file {}: {}", file_id, warning);
    }

    // 5. Normalize and clean the text through the LLM
    let cleaned = crate::cleaner::clean_text(
        state.llm.as_ref(),
        &state.prompts,
        &extraction.text,
    )
    .await?;

    Ok((cleaned, metadata))
}

fn map_missing_source_file(e: PortError) -> ApiError {
    match e {
        PortError::NotFound(_) => {
            ApiError::NotFound("Source file not found in Appwrite Storage.".to_string())
        }
        other => ApiError::Port(other),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate a Markdown reviewer from a stored document.
#[utoipa::path(
    post,
    path = "/generate/reviewer",
    request_body(content = GenerateReviewerRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Reviewer stored and catalogued", body = GenerateReviewerResponse),
        (status = 400, description = "Unsupported file type"),
        (status = 404, description = "Source file not found"),
        (status = 401, description = "Session required but missing or invalid"),
        (status = 500, description = "Generation or upload failure")
    ),
    tag = "generate"
)]
pub async fn generate_reviewer_handler(
    State(state): State<Arc<AppState>>,
    auth_user: Option<Extension<AuthUser>>,
    Form(req): Form<GenerateReviewerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = effective_user_id(
        auth_user.as_ref().map(|Extension(user)| user),
        req.user_id.as_deref(),
    )?;

    // 1. Download, extract and clean the source text
    let (cleaned, metadata) = fetch_clean_text(&state, &req.file_id).await?;

    // 2. Generate the reviewer Markdown
    let reviewer_md = generator::generate_reviewer(state.llm.as_ref(), &state.prompts, &cleaned).await?;

    // 3. Upload the Markdown as a new file named after the original
    let base_name = file_stem(&metadata.name);
    let output_file_name = format!("(Reviewer) {}.md", base_name);
    let new_file_id = unique_id();
    state
        .storage
        .create_file(
            &new_file_id,
            &output_file_name,
            "text/markdown",
            Bytes::from(reviewer_md),
            &user_id,
        )
        .await?;

    // 4. Log the metadata record, pointing back at the source
    state
        .catalog
        .create_record(NewFileRecord {
            user_id: user_id.clone(),
            kind: FileKind::Reviewer,
            name: file_stem(&output_file_name).to_string(),
            file_id: new_file_id.clone(),
            source_file_id: req.file_id.clone(),
        })
        .await?;

    info!(
        "Generated reviewer {} from file {} for user {}",
        new_file_id, req.file_id, user_id
    );

    Ok(Json(GenerateReviewerResponse {
        success: true,
        message: "Reviewer generated and uploaded successfully.".to_string(),
        file_id: new_file_id,
    }))
}

/// Generate typed flashcards from a stored document.
///
/// Counts are clamped to [0, 100] per type; if every count is zero the
/// handler skips generation entirely and returns an empty result without
/// touching storage or the model.
#[utoipa::path(
    post,
    path = "/generate/flashcards",
    request_body(content = GenerateFlashcardsRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Flashcards stored and returned", body = GenerateFlashcardsResponse),
        (status = 400, description = "Unsupported file type"),
        (status = 404, description = "Source file not found"),
        (status = 401, description = "Session required but missing or invalid"),
        (status = 500, description = "Generation, parsing or upload failure")
    ),
    tag = "generate"
)]
pub async fn generate_flashcards_handler(
    State(state): State<Arc<AppState>>,
    auth_user: Option<Extension<AuthUser>>,
    Form(req): Form<GenerateFlashcardsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = effective_user_id(
        auth_user.as_ref().map(|Extension(user)| user),
        req.user_id.as_deref(),
    )?;

    // 1. Clamp the requested counts into a plan; an all-zero request is a
    //    no-op answered before any cloud or model call
    let plan = match FlashcardPlan::new(
        req.multiple_choice,
        req.identification,
        req.true_or_false,
        req.enumeration,
    ) {
        Ok(plan) => plan,
        Err(_) => {
            return Ok(Json(GenerateFlashcardsResponse {
                success: true,
                message: "Flashcard generation skipped as all item counts are zero.".to_string(),
                file_id: None,
                flashcards: Vec::new(),
            }));
        }
    };

    // 2. Download, extract and clean the source text
    let (cleaned, metadata) = fetch_clean_text(&state, &req.file_id).await?;

    // 3. Ask the model for the cards and parse them strictly
    let raw = generator::generate_flashcards(state.llm.as_ref(), &state.prompts, &cleaned, &plan)
        .await?;
    let mut flashcards: Vec<Flashcard> =
        generator::parse_flashcards(&raw).map_err(|_| ApiError::MalformedFlashcards)?;

    // 4. The stored and returned order is always the fixed type order,
    //    whatever the model produced
    sort_flashcards(&mut flashcards);
    let canonical_json = serde_json::to_string(&flashcards)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize flashcards: {}", e)))?;

    // 5. Upload the JSON as a new file named after the original
    let base_name = file_stem(&metadata.name);
    let output_file_name = format!("(Flashcards) {}.json", base_name);
    let new_file_id = unique_id();
    state
        .storage
        .create_file(
            &new_file_id,
            &output_file_name,
            "application/json",
            Bytes::from(canonical_json),
            &user_id,
        )
        .await?;

    // 6. Log the metadata record, pointing back at the source
    state
        .catalog
        .create_record(NewFileRecord {
            user_id: user_id.clone(),
            kind: FileKind::Flashcards,
            name: file_stem(&output_file_name).to_string(),
            file_id: new_file_id.clone(),
            source_file_id: req.file_id.clone(),
        })
        .await?;

    info!(
        "Generated {} flashcards ({}) from file {} for user {}",
        flashcards.len(),
        new_file_id,
        req.file_id,
        user_id
    );

    Ok(Json(GenerateFlashcardsResponse {
        success: true,
        message: "Flashcards generated and uploaded successfully.".to_string(),
        file_id: Some(new_file_id),
        flashcards,
    }))
}
