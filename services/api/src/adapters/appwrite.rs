//! services/api/src/adapters/appwrite.rs
//!
//! This module contains the Appwrite adapters, the concrete implementations
//! of the `FileStorageService`, `FileCatalogService` and
//! `SessionVerificationService` ports from the `core` crate. They talk to
//! Appwrite's REST API over `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use quickrev_core::domain::{FileKind, FileRecord, NewFileRecord, StoredFileInfo};
use quickrev_core::ports::{
    FileCatalogService, FileStorageService, PortError, PortResult, SessionVerificationService,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

//=========================================================================================
// The Shared HTTP Client
//=========================================================================================

/// Connection details shared by every Appwrite adapter. Server-to-server
/// calls authenticate with the project API key; session checks send the
/// user's session secret instead.
#[derive(Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteClient {
    /// Creates a new `AppwriteClient`. `endpoint` must not end with a slash.
    pub fn new(http: reqwest::Client, endpoint: String, project_id: String, api_key: String) -> Self {
        Self {
            http,
            endpoint,
            project_id,
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn with_key(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    /// Decodes a successful response, or maps the Appwrite error body onto
    /// the port error taxonomy.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> PortResult<T> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to decode Appwrite response: {}", e)))
    }

    async fn body_bytes(response: reqwest::Response) -> PortResult<Bytes> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .bytes()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read Appwrite response body: {}", e)))
    }
}

async fn error_from_response(response: reqwest::Response) -> PortError {
    let status = response.status();
    let message = match response.json::<AppwriteErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown Appwrite error")
            .to_string(),
    };
    match status.as_u16() {
        404 => PortError::NotFound(message),
        401 | 403 => PortError::Unauthorized(message),
        code => PortError::Upstream {
            status: code,
            message,
        },
    }
}

//=========================================================================================
// "Impure" Wire Structs
//=========================================================================================

#[derive(Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct StorageFileWire {
    #[serde(rename = "$id")]
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "sizeOriginal")]
    size_bytes: u64,
}

impl StorageFileWire {
    fn to_domain(self) -> StoredFileInfo {
        StoredFileInfo {
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
        }
    }
}

#[derive(Deserialize)]
struct DocumentWire {
    #[serde(rename = "$id")]
    id: String,
    user_id: String,
    #[serde(rename = "type")]
    kind: String,
    name: String,
    file_id: String,
    source_file_id: String,
    #[serde(rename = "$updatedAt")]
    updated_at: DateTime<Utc>,
}

impl DocumentWire {
    fn to_domain(self) -> PortResult<FileRecord> {
        Ok(FileRecord {
            id: self.id,
            user_id: self.user_id,
            kind: self
                .kind
                .parse()
                .map_err(|e: quickrev_core::domain::UnknownFileKind| {
                    PortError::Unexpected(e.to_string())
                })?,
            name: self.name,
            file_id: self.file_id,
            source_file_id: self.source_file_id,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Deserialize)]
struct DocumentListWire {
    documents: Vec<DocumentWire>,
}

#[derive(Deserialize)]
struct AccountWire {
    #[serde(rename = "$id")]
    id: String,
}

//=========================================================================================
// Query and Permission Builders
//=========================================================================================

// Appwrite expects each list query as a JSON object in a repeated
// `queries[]` parameter.

fn query_equal(attribute: &str, value: &str) -> String {
    json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
}

fn query_not_equal(attribute: &str, value: &str) -> String {
    json!({ "method": "notEqual", "attribute": attribute, "values": [value] }).to_string()
}

fn query_order_desc(attribute: &str) -> String {
    json!({ "method": "orderDesc", "attribute": attribute }).to_string()
}

fn query_limit(limit: u32) -> String {
    json!({ "method": "limit", "values": [limit] }).to_string()
}

// Uploaded blobs belong to their owner outright; catalog records stay
// read-only so the server remains the only writer.

fn blob_permissions(owner_id: &str) -> Vec<String> {
    vec![
        format!("read(\"user:{}\")", owner_id),
        format!("update(\"user:{}\")", owner_id),
        format!("write(\"user:{}\")", owner_id),
        format!("delete(\"user:{}\")", owner_id),
    ]
}

fn record_permissions(owner_id: &str) -> Vec<String> {
    vec![format!("read(\"user:{}\")", owner_id)]
}

//=========================================================================================
// `FileStorageService` Trait Implementation
//=========================================================================================

/// Blob storage backed by an Appwrite Storage bucket.
#[derive(Clone)]
pub struct AppwriteStorageAdapter {
    client: AppwriteClient,
    bucket_id: String,
}

impl AppwriteStorageAdapter {
    /// Creates a new `AppwriteStorageAdapter`.
    pub fn new(client: AppwriteClient, bucket_id: String) -> Self {
        Self { client, bucket_id }
    }

    fn files_url(&self, tail: &str) -> String {
        self.client
            .url(&format!("/storage/buckets/{}/files{}", self.bucket_id, tail))
    }
}

#[async_trait]
impl FileStorageService for AppwriteStorageAdapter {
    async fn create_file(
        &self,
        file_id: &str,
        file_name: &str,
        mime_type: &str,
        content: Bytes,
        owner_id: &str,
    ) -> PortResult<StoredFileInfo> {
        let part = reqwest::multipart::Part::stream(reqwest::Body::from(content))
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| PortError::Unexpected(format!("Invalid MIME type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);
        for permission in blob_permissions(owner_id) {
            form = form.text("permissions[]", permission);
        }

        let response = self
            .client
            .with_key(self.client.http.post(self.files_url("")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let wire: StorageFileWire = AppwriteClient::decode(response).await?;
        Ok(wire.to_domain())
    }

    async fn get_file(&self, file_id: &str) -> PortResult<StoredFileInfo> {
        let response = self
            .client
            .with_key(self.client.http.get(self.files_url(&format!("/{}", file_id))))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let wire: StorageFileWire = AppwriteClient::decode(response).await?;
        Ok(wire.to_domain())
    }

    async fn download(&self, file_id: &str) -> PortResult<Bytes> {
        let response = self
            .client
            .with_key(
                self.client
                    .http
                    .get(self.files_url(&format!("/{}/download", file_id))),
            )
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        AppwriteClient::body_bytes(response).await
    }

    async fn view(&self, file_id: &str) -> PortResult<Bytes> {
        let response = self
            .client
            .with_key(
                self.client
                    .http
                    .get(self.files_url(&format!("/{}/view", file_id))),
            )
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        AppwriteClient::body_bytes(response).await
    }
}

//=========================================================================================
// `FileCatalogService` Trait Implementation
//=========================================================================================

/// File metadata records kept in an Appwrite database collection.
#[derive(Clone)]
pub struct AppwriteCatalogAdapter {
    client: AppwriteClient,
    database_id: String,
    collection_id: String,
}

impl AppwriteCatalogAdapter {
    /// Creates a new `AppwriteCatalogAdapter`.
    pub fn new(client: AppwriteClient, database_id: String, collection_id: String) -> Self {
        Self {
            client,
            database_id,
            collection_id,
        }
    }

    fn documents_url(&self, tail: &str) -> String {
        self.client.url(&format!(
            "/databases/{}/collections/{}/documents{}",
            self.database_id, self.collection_id, tail
        ))
    }

    async fn list(&self, queries: &[String]) -> PortResult<Vec<FileRecord>> {
        let params: Vec<(&str, &str)> = queries
            .iter()
            .map(|query| ("queries[]", query.as_str()))
            .collect();

        let response = self
            .client
            .with_key(self.client.http.get(self.documents_url("")).query(&params))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let wire: DocumentListWire = AppwriteClient::decode(response).await?;
        wire.documents
            .into_iter()
            .map(DocumentWire::to_domain)
            .collect()
    }
}

#[async_trait]
impl FileCatalogService for AppwriteCatalogAdapter {
    async fn create_record(&self, record: NewFileRecord) -> PortResult<FileRecord> {
        let body = json!({
            // "unique()" asks the server to mint the document ID.
            "documentId": "unique()",
            "data": {
                "user_id": record.user_id,
                "type": record.kind.as_str(),
                "name": record.name,
                "file_id": record.file_id,
                "source_file_id": record.source_file_id,
            },
            "permissions": record_permissions(&record.user_id),
        });

        let response = self
            .client
            .with_key(self.client.http.post(self.documents_url("")).json(&body))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let wire: DocumentWire = AppwriteClient::decode(response).await?;
        wire.to_domain()
    }

    async fn list_by_user(&self, user_id: &str, kind: FileKind) -> PortResult<Vec<FileRecord>> {
        self.list(&[
            query_equal("user_id", user_id),
            query_equal("type", kind.as_str()),
            query_order_desc("$updatedAt"),
            query_limit(100),
        ])
        .await
    }

    async fn list_derived(&self, source_file_id: &str) -> PortResult<Vec<FileRecord>> {
        // The original record points at itself through source_file_id, so it
        // is excluded here rather than filtered by the caller.
        self.list(&[
            query_equal("source_file_id", source_file_id),
            query_not_equal("file_id", source_file_id),
            query_order_desc("$updatedAt"),
            query_limit(100),
        ])
        .await
    }

    async fn find_by_file_id(&self, file_id: &str) -> PortResult<FileRecord> {
        let mut records = self
            .list(&[query_equal("file_id", file_id), query_limit(1)])
            .await?;
        if records.is_empty() {
            return Err(PortError::NotFound(format!(
                "No file record found for file ID {}",
                file_id
            )));
        }
        Ok(records.remove(0))
    }

    async fn repoint_record(&self, record_id: &str, new_file_id: &str) -> PortResult<FileRecord> {
        let body = json!({ "data": { "file_id": new_file_id } });

        let response = self
            .client
            .with_key(
                self.client
                    .http
                    .patch(self.documents_url(&format!("/{}", record_id)))
                    .json(&body),
            )
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let wire: DocumentWire = AppwriteClient::decode(response).await?;
        wire.to_domain()
    }
}

//=========================================================================================
// `SessionVerificationService` Trait Implementation
//=========================================================================================

/// Resolves an Appwrite session secret to the account that owns it.
#[derive(Clone)]
pub struct AppwriteIdentityAdapter {
    client: AppwriteClient,
}

impl AppwriteIdentityAdapter {
    /// Creates a new `AppwriteIdentityAdapter`.
    pub fn new(client: AppwriteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionVerificationService for AppwriteIdentityAdapter {
    async fn verify_session(&self, session_cookie: &str) -> PortResult<String> {
        // Session auth: the user's secret replaces the server API key.
        let response = self
            .client
            .http
            .get(self.client.url("/account"))
            .header("X-Appwrite-Project", &self.client.project_id)
            .header("X-Appwrite-Session", session_cookie)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let account: AccountWire = AppwriteClient::decode(response).await?;
        Ok(account.id)
    }
}
