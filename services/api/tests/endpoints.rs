//! Integration tests for the HTTP endpoints.
//!
//! Every test drives the real router through `tower::ServiceExt::oneshot`
//! with in-memory implementations of the four service ports, so no network
//! requests are made. The LLM mock replays a scripted response queue and
//! records every prompt it was sent.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use api_lib::config::{AuthMode, Config};
use api_lib::prompts::PromptStore;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use quickrev_core::domain::{FileKind, FileRecord, NewFileRecord, StoredFileInfo};
use quickrev_core::ports::{
    FileCatalogService, FileStorageService, PortError, PortResult, SessionVerificationService,
    TextGenerationService,
};
use tower::ServiceExt;

//=========================================================================================
// In-Memory Port Implementations
//=========================================================================================

struct StoredBlob {
    info: StoredFileInfo,
    content: Bytes,
    owner_id: String,
}

/// Blob storage backed by a HashMap. Downloads are logged so tests can
/// assert that cheap rejections never cost a transfer.
#[derive(Default)]
struct MockStorage {
    files: Mutex<HashMap<String, StoredBlob>>,
    downloads: Mutex<Vec<String>>,
}

impl MockStorage {
    fn seed(&self, file_id: &str, name: &str, mime_type: &str, content: &str) {
        let blob = StoredBlob {
            info: StoredFileInfo {
                id: file_id.to_string(),
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                size_bytes: content.len() as u64,
            },
            content: Bytes::from(content.to_string()),
            owner_id: "seed".to_string(),
        };
        self.files.lock().unwrap().insert(file_id.to_string(), blob);
    }

    fn blob(&self, file_id: &str) -> Option<(StoredFileInfo, Bytes, String)> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|b| (b.info.clone(), b.content.clone(), b.owner_id.clone()))
    }

    fn download_log(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStorageService for MockStorage {
    async fn create_file(
        &self,
        file_id: &str,
        file_name: &str,
        mime_type: &str,
        content: Bytes,
        owner_id: &str,
    ) -> PortResult<StoredFileInfo> {
        let info = StoredFileInfo {
            id: file_id.to_string(),
            name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: content.len() as u64,
        };
        self.files.lock().unwrap().insert(
            file_id.to_string(),
            StoredBlob {
                info: info.clone(),
                content,
                owner_id: owner_id.to_string(),
            },
        );
        Ok(info)
    }

    async fn get_file(&self, file_id: &str) -> PortResult<StoredFileInfo> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|b| b.info.clone())
            .ok_or_else(|| PortError::NotFound("no such blob".to_string()))
    }

    async fn download(&self, file_id: &str) -> PortResult<Bytes> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|b| b.content.clone())
            .ok_or_else(|| PortError::NotFound("no such blob".to_string()))
    }

    async fn view(&self, file_id: &str) -> PortResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .map(|b| b.content.clone())
            .ok_or_else(|| PortError::NotFound("no such blob".to_string()))
    }
}

/// Catalog backed by a Vec. Each write gets a strictly later timestamp so
/// "newest first" ordering is deterministic.
#[derive(Default)]
struct MockCatalog {
    records: Mutex<Vec<FileRecord>>,
    clock: AtomicI64,
}

impl MockCatalog {
    fn next_time(&self) -> DateTime<Utc> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp(1_700_000_000 + tick, 0).unwrap()
    }

    fn all(&self) -> Vec<FileRecord> {
        self.records.lock().unwrap().clone()
    }

    fn find_kind(&self, kind: FileKind) -> Option<FileRecord> {
        self.all().into_iter().find(|r| r.kind == kind)
    }
}

#[async_trait]
impl FileCatalogService for MockCatalog {
    async fn create_record(&self, record: NewFileRecord) -> PortResult<FileRecord> {
        let mut records = self.records.lock().unwrap();
        let created = FileRecord {
            id: format!("doc-{}", records.len() + 1),
            user_id: record.user_id,
            kind: record.kind,
            name: record.name,
            file_id: record.file_id,
            source_file_id: record.source_file_id,
            updated_at: self.next_time(),
        };
        records.push(created.clone());
        Ok(created)
    }

    async fn list_by_user(&self, user_id: &str, kind: FileKind) -> PortResult<Vec<FileRecord>> {
        let mut matching: Vec<FileRecord> = self
            .all()
            .into_iter()
            .filter(|r| r.user_id == user_id && r.kind == kind)
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matching)
    }

    async fn list_derived(&self, source_file_id: &str) -> PortResult<Vec<FileRecord>> {
        let mut matching: Vec<FileRecord> = self
            .all()
            .into_iter()
            .filter(|r| r.source_file_id == source_file_id && r.file_id != source_file_id)
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matching)
    }

    async fn find_by_file_id(&self, file_id: &str) -> PortResult<FileRecord> {
        self.all()
            .into_iter()
            .find(|r| r.file_id == file_id)
            .ok_or_else(|| PortError::NotFound("no such record".to_string()))
    }

    async fn repoint_record(&self, record_id: &str, new_file_id: &str) -> PortResult<FileRecord> {
        let updated_at = self.next_time();
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| PortError::NotFound("no such record".to_string()))?;
        record.file_id = new_file_id.to_string();
        record.updated_at = updated_at;
        Ok(record.clone())
    }
}

/// Replays a scripted queue of responses and records every prompt.
#[derive(Default)]
struct MockLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn script(&self, responses: &[&str]) {
        let mut queue = self.responses.lock().unwrap();
        for response in responses {
            queue.push_back(response.to_string());
        }
    }

    fn sent_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationService for MockLlm {
    async fn send_prompt(&self, prompt: &str) -> PortResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortError::Unexpected("mock response queue exhausted".to_string()))
    }
}

/// Resolves every session to one fixed user, or rejects them all.
struct MockIdentity {
    user: Option<String>,
    seen_secrets: Mutex<Vec<String>>,
}

#[async_trait]
impl SessionVerificationService for MockIdentity {
    async fn verify_session(&self, session_cookie: &str) -> PortResult<String> {
        self.seen_secrets
            .lock()
            .unwrap()
            .push(session_cookie.to_string());
        match &self.user {
            Some(user) => Ok(user.clone()),
            None => Err(PortError::Unauthorized("Invalid session".to_string())),
        }
    }
}

//=========================================================================================
// Test App Construction
//=========================================================================================

struct TestApp {
    app: Router,
    storage: Arc<MockStorage>,
    catalog: Arc<MockCatalog>,
    llm: Arc<MockLlm>,
    identity: Arc<MockIdentity>,
}

fn test_config(auth_mode: AuthMode) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: tracing::Level::INFO,
        appwrite_endpoint: "https://cloud.test/v1".to_string(),
        appwrite_project_id: "quickrev-test".to_string(),
        appwrite_api_key: "server-key".to_string(),
        bucket_id: "bucket".to_string(),
        database_id: "db".to_string(),
        file_collection_id: "files".to_string(),
        gemini_api_key: "unused".to_string(),
        gemini_model: "gemini-test".to_string(),
        llm_api_base: "https://llm.test".to_string(),
        prompts_path: PathBuf::from("/nonexistent"),
        auth_mode,
        cors_allowed_origins: Vec::new(),
    }
}

/// Builds the router over fresh mocks. `session_user` is the account every
/// verified session resolves to; `None` makes verification fail.
fn test_app(auth_mode: AuthMode, session_user: Option<&str>) -> TestApp {
    let storage = Arc::new(MockStorage::default());
    let catalog = Arc::new(MockCatalog::default());
    let llm = Arc::new(MockLlm::default());
    let identity = Arc::new(MockIdentity {
        user: session_user.map(str::to_string),
        seen_secrets: Mutex::new(Vec::new()),
    });
    let state = Arc::new(AppState {
        config: Arc::new(test_config(auth_mode)),
        storage: storage.clone(),
        catalog: catalog.clone(),
        llm: llm.clone(),
        identity: identity.clone(),
        prompts: Arc::new(PromptStore::new(PathBuf::from("/nonexistent"))),
    });
    TestApp {
        app: web::router(state),
        storage,
        catalog,
        llm,
        identity,
    }
}

fn trusted_app() -> TestApp {
    test_app(AuthMode::Trusted, Some("unused"))
}

//=========================================================================================
// Request Helpers
//=========================================================================================

const BOUNDARY: &str = "quickrev-test-boundary";

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(
    file_name: &str,
    mime_type: &str,
    content: &str,
    user_id: Option<&str>,
) -> Request<Body> {
    let mut body = String::new();
    body.push_str(&format!("--{BOUNDARY}\r\n"));
    body.push_str(&format!(
        "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
    ));
    body.push_str(&format!("Content-Type: {mime_type}\r\n\r\n"));
    body.push_str(content);
    body.push_str("\r\n");
    if let Some(user_id) = user_id {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        body.push_str("Content-Disposition: form-data; name=\"user_id\"\r\n\r\n");
        body.push_str(user_id);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method(Method::POST)
        .uri("/cloud/file/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

//=========================================================================================
// Upload and Listing
//=========================================================================================

#[tokio::test]
async fn upload_then_list_round_trip() {
    let t = trusted_app();

    let response = send(
        &t.app,
        upload_request("Bio Notes.pdf", "application/pdf", "cells", Some("u1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let uploaded = body_json(response).await;
    assert_eq!(uploaded["success"], true);
    assert_eq!(uploaded["file_name"], "Bio Notes.pdf");
    let file_id = uploaded["file_id"].as_str().unwrap().to_string();

    // The blob keeps the full name and the uploader becomes the owner.
    let (info, content, owner) = t.storage.blob(&file_id).unwrap();
    assert_eq!(info.name, "Bio Notes.pdf");
    assert_eq!(info.mime_type, "application/pdf");
    assert_eq!(content.as_ref(), b"cells");
    assert_eq!(owner, "u1");

    // The listing shows the stem, not the full file name.
    let response = send(&t.app, get_request("/cloud/file/list?user_id=u1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(
        listing["message"],
        "Successfully retrieved 1 files of type 'original' for user u1."
    );
    assert_eq!(listing["files"][0]["name"], "Bio Notes");
    assert_eq!(listing["files"][0]["file_id"], file_id.as_str());
    assert_eq!(listing["files"][0]["document_id"], "doc-1");

    // The original's record points at its own file.
    let record = t.catalog.find_kind(FileKind::Original).unwrap();
    assert_eq!(record.source_file_id, record.file_id);
}

#[tokio::test]
async fn upload_without_a_file_part_is_rejected() {
    let t = trusted_app();
    let mut body = String::new();
    body.push_str(&format!("--{BOUNDARY}\r\n"));
    body.push_str("Content-Disposition: form-data; name=\"user_id\"\r\n\r\nu1\r\n");
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/cloud/file/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["success"], false);
    assert_eq!(error["message"], "Multipart form must include a file");
}

#[tokio::test]
async fn trusted_mode_requires_an_explicit_user_id() {
    let t = trusted_app();
    let response = send(
        &t.app,
        upload_request("notes.txt", "text/plain", "hello", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(
        error["message"],
        "A user_id is required when no session is present."
    );
}

#[tokio::test]
async fn listing_an_unknown_file_type_is_rejected() {
    let t = trusted_app();
    let response = send(&t.app, get_request("/cloud/file/list?user_id=u1&type=audio")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["message"], "Unknown file type: audio");
}

//=========================================================================================
// View and Association
//=========================================================================================

#[tokio::test]
async fn view_serves_bytes_with_the_stored_mime_and_cache_headers() {
    let t = trusted_app();
    t.storage.seed("f1", "diagram.pdf", "application/pdf", "%PDF-1.5 fake");

    let response = send(&t.app, get_request("/cloud/file/view?file_id=f1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=31536000"
    );
    // Served inline: no attachment disposition.
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), b"%PDF-1.5 fake");
}

#[tokio::test]
async fn viewing_a_missing_file_is_a_404_not_a_500() {
    let t = trusted_app();
    let response = send(&t.app, get_request("/cloud/file/view?file_id=nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["success"], false);
    assert_eq!(
        error["message"],
        "The requested file (ID: nope) was not found in storage."
    );
}

#[tokio::test]
async fn association_lists_derived_files_newest_first_without_the_original() {
    let t = trusted_app();
    t.catalog
        .create_record(NewFileRecord {
            user_id: "u1".to_string(),
            kind: FileKind::Original,
            name: "Bio".to_string(),
            file_id: "f-orig".to_string(),
            source_file_id: "f-orig".to_string(),
        })
        .await
        .unwrap();
    t.catalog
        .create_record(NewFileRecord {
            user_id: "u1".to_string(),
            kind: FileKind::Reviewer,
            name: "(Reviewer) Bio".to_string(),
            file_id: "f-rev".to_string(),
            source_file_id: "f-orig".to_string(),
        })
        .await
        .unwrap();
    t.catalog
        .create_record(NewFileRecord {
            user_id: "u1".to_string(),
            kind: FileKind::Flashcards,
            name: "(Flashcards) Bio".to_string(),
            file_id: "f-cards".to_string(),
            source_file_id: "f-orig".to_string(),
        })
        .await
        .unwrap();

    let response = send(
        &t.app,
        get_request("/cloud/file/associate?source_file_id=f-orig"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(
        listing["message"],
        "Successfully retrieved 2 associated files for source ID f-orig."
    );
    let files = listing["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["type"], "flashcards");
    assert_eq!(files[1]["type"], "reviewer");
    assert_eq!(files[1]["name"], "(Reviewer) Bio");
}

//=========================================================================================
// Reviewer Generation
//=========================================================================================

#[tokio::test]
async fn reviewer_generation_stores_markdown_and_records_lineage() {
    let t = trusted_app();
    t.storage
        .seed("f-src", "Biology Notes.txt", "text/plain", "cells  are\n\n\n\nsmall");
    t.llm.script(&["CLEANED TEXT", "# Reviewer\n\nBody"]);

    let response = send(
        &t.app,
        form_request("/generate/reviewer", "file_id=f-src&user_id=u1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated = body_json(response).await;
    assert_eq!(generated["success"], true);
    assert_eq!(
        generated["message"],
        "Reviewer generated and uploaded successfully."
    );
    let new_file_id = generated["file_id"].as_str().unwrap().to_string();
    assert_ne!(new_file_id, "f-src");

    // The Markdown lands in storage under a derived name.
    let (info, content, owner) = t.storage.blob(&new_file_id).unwrap();
    assert_eq!(info.name, "(Reviewer) Biology Notes.md");
    assert_eq!(info.mime_type, "text/markdown");
    assert_eq!(content.as_ref(), b"# Reviewer\n\nBody");
    assert_eq!(owner, "u1");

    // The record points back at the source.
    let record = t.catalog.find_kind(FileKind::Reviewer).unwrap();
    assert_eq!(record.name, "(Reviewer) Biology Notes");
    assert_eq!(record.file_id, new_file_id);
    assert_eq!(record.source_file_id, "f-src");
    assert_eq!(record.user_id, "u1");

    // First prompt carries the whitespace-normalized text, second the
    // cleaned text the first call returned.
    let prompts = t.llm.sent_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].ends_with("cells are\n\nsmall"));
    assert!(prompts[1].ends_with("\n\nCLEANED TEXT"));
}

#[tokio::test]
async fn unsupported_extensions_are_rejected_before_any_download() {
    let t = trusted_app();
    t.storage.seed("f-csv", "grades.csv", "text/csv", "a,b,c");

    let response = send(
        &t.app,
        form_request("/generate/reviewer", "file_id=f-csv&user_id=u1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["message"], "Unsupported file type: csv");

    assert!(t.storage.download_log().is_empty());
    assert!(t.llm.sent_prompts().is_empty());
}

#[tokio::test]
async fn generating_from_a_missing_source_is_a_404() {
    let t = trusted_app();
    let response = send(
        &t.app,
        form_request("/generate/reviewer", "file_id=ghost&user_id=u1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["message"], "Source file not found in Appwrite Storage.");
}

//=========================================================================================
// Flashcard Generation
//=========================================================================================

const SCRAMBLED_CARDS: &str = "```json\n[\
    {\"type\": \"True or False\", \"statement\": \"Mitochondria make ATP.\", \"answer\": true},\
    {\"type\": \"Multiple Choice\", \"question\": \"Powerhouse of the cell?\", \"choices\": [\"Nucleus\", \"Mitochondria\"], \"answer\": \"Mitochondria\"},\
    {\"type\": \"Identification\", \"question\": \"Basic unit of life?\", \"answer\": \"Cell\"}\
]\n```";

#[tokio::test]
async fn all_zero_flashcard_counts_skip_generation_entirely() {
    let t = trusted_app();
    t.storage.seed("f-src", "Chem.txt", "text/plain", "atoms");

    let response = send(
        &t.app,
        form_request(
            "/generate/flashcards",
            "file_id=f-src&user_id=u1&multiple_choice=0&identification=0&true_or_false=0&enumeration=0",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let skipped = body_json(response).await;
    assert_eq!(skipped["success"], true);
    assert_eq!(
        skipped["message"],
        "Flashcard generation skipped as all item counts are zero."
    );
    assert_eq!(skipped["file_id"], serde_json::Value::Null);
    assert_eq!(skipped["flashcards"].as_array().unwrap().len(), 0);

    // Nothing was fetched, generated, or stored.
    assert!(t.storage.download_log().is_empty());
    assert!(t.llm.sent_prompts().is_empty());
    assert!(t.catalog.all().is_empty());
}

#[tokio::test]
async fn flashcards_are_sorted_by_type_and_stored_as_canonical_json() {
    let t = trusted_app();
    t.storage.seed("f-src", "Chem.txt", "text/plain", "atoms");
    t.llm.script(&["CLEANED", SCRAMBLED_CARDS]);

    let response = send(
        &t.app,
        form_request(
            "/generate/flashcards",
            "file_id=f-src&user_id=u1&multiple_choice=1&identification=1&true_or_false=1&enumeration=0",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated = body_json(response).await;
    assert_eq!(
        generated["message"],
        "Flashcards generated and uploaded successfully."
    );
    let cards = generated["flashcards"].as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0]["type"], "Multiple Choice");
    assert_eq!(cards[1]["type"], "Identification");
    assert_eq!(cards[2]["type"], "True or False");

    // The stored blob holds the sorted array, not the model's raw response.
    let new_file_id = generated["file_id"].as_str().unwrap();
    let (info, content, _) = t.storage.blob(new_file_id).unwrap();
    assert_eq!(info.name, "(Flashcards) Chem.json");
    assert_eq!(info.mime_type, "application/json");
    let stored: serde_json::Value = serde_json::from_slice(&content).unwrap();
    assert_eq!(stored[0]["type"], "Multiple Choice");
    assert_eq!(stored[2]["type"], "True or False");

    let record = t.catalog.find_kind(FileKind::Flashcards).unwrap();
    assert_eq!(record.name, "(Flashcards) Chem");
    assert_eq!(record.source_file_id, "f-src");

    // The generation prompt spells out the derived total and skips the
    // zero-count type.
    let prompts = t.llm.sent_prompts();
    assert!(prompts[1].contains("MUST be **3**"));
    assert!(prompts[1].contains("True or False (Quantity: 1)"));
    assert!(!prompts[1].contains("Enumeration (Quantity:"));
}

#[tokio::test]
async fn omitted_flashcard_counts_default_to_ten_each() {
    let t = trusted_app();
    t.storage.seed("f-src", "Chem.txt", "text/plain", "atoms");
    t.llm.script(&["CLEANED", "[]"]);

    let response = send(
        &t.app,
        form_request("/generate/flashcards", "file_id=f-src&user_id=u1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let prompts = t.llm.sent_prompts();
    assert!(prompts[1].contains("MUST be **40**"));
    for label in [
        "Multiple Choice (Quantity: 10)",
        "Identification (Quantity: 10)",
        "True or False (Quantity: 10)",
        "Enumeration (Quantity: 10)",
    ] {
        assert!(prompts[1].contains(label), "missing: {}", label);
    }
}

#[tokio::test]
async fn malformed_flashcard_output_is_a_500_with_a_fixed_message() {
    let t = trusted_app();
    t.storage.seed("f-src", "Chem.txt", "text/plain", "atoms");
    t.llm
        .script(&["CLEANED", "Sure! Here are your flashcards: [..."]);

    let response = send(
        &t.app,
        form_request(
            "/generate/flashcards",
            "file_id=f-src&user_id=u1&multiple_choice=1&identification=0&true_or_false=0&enumeration=0",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await;
    assert_eq!(error["success"], false);
    assert_eq!(error["message"], "LLM returned malformed JSON for flashcards.");

    // Nothing is stored when parsing fails.
    assert!(t.catalog.all().is_empty());
}

//=========================================================================================
// Content Update
//=========================================================================================

#[tokio::test]
async fn updating_repoints_the_record_at_a_fresh_blob() {
    let t = trusted_app();
    t.storage.seed("f-old", "Draft.md", "text/markdown", "# v1");
    t.catalog
        .create_record(NewFileRecord {
            user_id: "u1".to_string(),
            kind: FileKind::Reviewer,
            name: "Draft".to_string(),
            file_id: "f-old".to_string(),
            source_file_id: "f-src".to_string(),
        })
        .await
        .unwrap();

    let response = send(
        &t.app,
        json_request(
            Method::PUT,
            "/cloud/file/update",
            serde_json::json!({ "file_id": "f-old", "content": "# v2" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["message"], "File content updated successfully.");
    assert_eq!(updated["document_id"], "doc-1");
    let new_file_id = updated["file_id"].as_str().unwrap();
    assert_ne!(new_file_id, "f-old");

    // The replacement blob inherits the old name/MIME and the record's owner.
    let (info, content, owner) = t.storage.blob(new_file_id).unwrap();
    assert_eq!(info.name, "Draft.md");
    assert_eq!(info.mime_type, "text/markdown");
    assert_eq!(content.as_ref(), b"# v2");
    assert_eq!(owner, "u1");

    // The record now points at the replacement; the old blob survives.
    let record = t.catalog.find_kind(FileKind::Reviewer).unwrap();
    assert_eq!(record.file_id, new_file_id);
    assert!(t.storage.blob("f-old").is_some());
}

#[tokio::test]
async fn updating_an_uncatalogued_file_is_a_404() {
    let t = trusted_app();
    let response = send(
        &t.app,
        json_request(
            Method::PUT,
            "/cloud/file/update",
            serde_json::json!({ "file_id": "f-nope", "content": "x" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = body_json(response).await;
    assert_eq!(error["message"], "No file record found for file ID f-nope.");
}

//=========================================================================================
// DOCX Download
//=========================================================================================

#[tokio::test]
async fn docx_download_returns_an_attachment_named_after_the_reviewer() {
    let t = trusted_app();
    t.storage.seed(
        "f-rev",
        "(Reviewer) Biology.md",
        "text/markdown",
        "# Title\n\nBody text",
    );

    let response = send(
        &t.app,
        json_request(
            Method::POST,
            "/download/reviewer/docx",
            serde_json::json!({ "reviewer_file_id": "f-rev" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        api_lib::convert::DOCX_MIME_TYPE
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"(Reviewer) Biology.docx\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // A ZIP container, i.e. a real DOCX package.
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn inline_content_wins_over_the_stored_reviewer() {
    let t = trusted_app();
    t.storage
        .seed("f-rev", "(Reviewer) Biology.md", "text/markdown", "# Stored");

    let response = send(
        &t.app,
        json_request(
            Method::POST,
            "/download/reviewer/docx",
            serde_json::json!({ "reviewer_file_id": "f-rev", "content": "# Edited" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    // The stored blob is never fetched when the client sends its own copy.
    assert!(t.storage.download_log().is_empty());
}

#[tokio::test]
async fn docx_download_needs_a_file_id_or_inline_content() {
    let t = trusted_app();
    let response = send(
        &t.app,
        json_request(
            Method::POST,
            "/download/reviewer/docx",
            serde_json::json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(
        error["message"],
        "Either reviewer_file_id or content must be provided."
    );
}

//=========================================================================================
// Session Auth
//=========================================================================================

#[tokio::test]
async fn session_mode_blocks_protected_routes_without_a_cookie() {
    let t = test_app(AuthMode::Session, Some("real-user"));
    let response = send(
        &t.app,
        upload_request("notes.txt", "text/plain", "hello", Some("u1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = body_json(response).await;
    assert_eq!(error["message"], "Not authenticated. Session cookie missing.");
}

#[tokio::test]
async fn session_mode_leaves_read_endpoints_open() {
    let t = test_app(AuthMode::Session, Some("real-user"));
    // No cookie, but the route is public: a 404 for the ID, not a 401.
    let response = send(&t.app, get_request("/cloud/file/view?file_id=nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn a_verified_session_overrides_the_claimed_user_id() {
    let t = test_app(AuthMode::Session, Some("real-user"));
    t.storage
        .seed("f-src", "Biology.txt", "text/plain", "cells");
    t.llm.script(&["CLEANED", "# Reviewer"]);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate/reviewer")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(
            header::COOKIE,
            "other=1; a_session_quickrev-test=secret-token",
        )
        .body(Body::from("file_id=f-src&user_id=spoofed"))
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The project-scoped cookie value reached the verifier intact.
    assert_eq!(
        t.identity.seen_secrets.lock().unwrap().as_slice(),
        ["secret-token"]
    );

    // The artifact belongs to the session's account, not the claimed one.
    let record = t.catalog.find_kind(FileKind::Reviewer).unwrap();
    assert_eq!(record.user_id, "real-user");
    let (_, _, owner) = t.storage.blob(&record.file_id).unwrap();
    assert_eq!(owner, "real-user");
}

#[tokio::test]
async fn me_resolves_the_session_to_its_account() {
    let t = test_app(AuthMode::Trusted, Some("acct-1"));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header::COOKIE, "a_session_quickrev-test=tok")
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["user_id"], "acct-1");
    assert_eq!(me["is_authenticated"], true);
}

#[tokio::test]
async fn me_rejects_an_invalid_session() {
    let t = test_app(AuthMode::Trusted, None);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header::COOKIE, "a_session_quickrev-test=expired")
        .body(Body::empty())
        .unwrap();
    let response = send(&t.app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error = body_json(response).await;
    assert_eq!(error["message"], "Authentication failed: Invalid session");
}
