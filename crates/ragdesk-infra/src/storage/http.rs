//! HTTP client for a remote storage/embedding service.
//!
//! Wire format:
//! - `POST {base}/documents` with the raw bytes as body, the mime type as
//!   `content-type`, and `x-file-id` / `x-file-name` headers. Responds with
//!   `{"storage_ref": "..."}`.
//! - `POST {base}/documents/process` with `{"storage_ref": "..."}`. Responds
//!   with `{"indexed_entry_id": "..."}`.

use std::time::Duration;

use ragdesk_core::ingest::storage::{StorageService, UploadMetadata};
use ragdesk_types::error::{ProcessingError, UploadError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    storage_ref: String,
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    storage_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    indexed_entry_id: String,
}

pub struct HttpStorageService {
    client: reqwest::Client,
    base_url: String,
    max_file_size_bytes: u64,
}

impl HttpStorageService {
    /// Upper bound on a single request, uploads included.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(base_url: impl Into<String>, max_file_size_bytes: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_file_size_bytes,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn upload_error(status: reqwest::StatusCode, body: String, metadata: &UploadMetadata, max: u64) -> UploadError {
    match status.as_u16() {
        413 => UploadError::TooLarge {
            size: metadata.size_bytes,
            max,
        },
        415 => UploadError::UnsupportedType(metadata.mime_type.clone()),
        _ => UploadError::Rejected(format!("HTTP {status}: {body}")),
    }
}

impl StorageService for HttpStorageService {
    async fn upload_bytes(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> Result<String, UploadError> {
        let response = self
            .client
            .post(self.url("/documents"))
            .header("content-type", &metadata.mime_type)
            .header("x-file-id", metadata.file_id.to_string())
            .header("x-file-name", &metadata.name)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| UploadError::Rejected(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(status, body, metadata, self.max_file_size_bytes));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Rejected(format!("failed to parse response: {e}")))?;
        Ok(parsed.storage_ref)
    }

    async fn process_document(&self, storage_ref: &str) -> Result<String, ProcessingError> {
        let response = self
            .client
            .post(self.url("/documents/process"))
            .json(&ProcessRequest { storage_ref })
            .send()
            .await
            .map_err(|e| ProcessingError::ProcessingFailed(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessingError::ProcessingFailed(format!("HTTP {status}: {body}")));
        }

        let parsed: ProcessResponse = response.json().await.map_err(|e| {
            ProcessingError::ProcessingFailed(format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.indexed_entry_id)
    }
}
