//! crates/quickrev_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like cloud storage or LLM APIs.

use crate::domain::{FileKind, FileRecord, NewFileRecord, StoredFileInfo};
use async_trait::async_trait;
use bytes::Bytes;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., cloud APIs, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Upstream service error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Blob storage: upload, metadata lookup, and the two read paths.
#[async_trait]
pub trait FileStorageService: Send + Sync {
    /// Uploads `content` under the caller-chosen `file_id`, granting the
    /// owner full access to the resulting file.
    async fn create_file(
        &self,
        file_id: &str,
        file_name: &str,
        mime_type: &str,
        content: Bytes,
        owner_id: &str,
    ) -> PortResult<StoredFileInfo>;

    async fn get_file(&self, file_id: &str) -> PortResult<StoredFileInfo>;

    /// Fetches the raw bytes for server-side processing.
    async fn download(&self, file_id: &str) -> PortResult<Bytes>;

    /// Fetches the raw bytes for inline display.
    async fn view(&self, file_id: &str) -> PortResult<Bytes>;
}

/// The metadata catalog relating stored blobs to users and to each other.
#[async_trait]
pub trait FileCatalogService: Send + Sync {
    async fn create_record(&self, record: NewFileRecord) -> PortResult<FileRecord>;

    /// A user's records of one kind, newest first.
    async fn list_by_user(&self, user_id: &str, kind: FileKind) -> PortResult<Vec<FileRecord>>;

    /// Records derived from the given original, newest first. The original's
    /// own record is excluded.
    async fn list_derived(&self, source_file_id: &str) -> PortResult<Vec<FileRecord>>;

    async fn find_by_file_id(&self, file_id: &str) -> PortResult<FileRecord>;

    /// Points an existing record at a replacement blob.
    async fn repoint_record(&self, record_id: &str, new_file_id: &str) -> PortResult<FileRecord>;
}

/// A single-turn text generation API. One prompt in, the model's text out;
/// callers see all failures as one generic error.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn send_prompt(&self, prompt: &str) -> PortResult<String>;
}

/// Resolves a session token to the user id it belongs to.
#[async_trait]
pub trait SessionVerificationService: Send + Sync {
    async fn verify_session(&self, session_cookie: &str) -> PortResult<String>;
}
