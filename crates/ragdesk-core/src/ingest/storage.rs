//! StorageService trait definition and its dynamic-dispatch wrapper.
//!
//! The storage/embedding service accepts raw bytes and turns a stored
//! document into an indexed entry. Implementations live in ragdesk-infra
//! (simulated and HTTP-backed).

use std::future::Future;
use std::pin::Pin;

use ragdesk_types::error::{ProcessingError, UploadError};
use uuid::Uuid;

/// Metadata sent alongside the bytes of an upload.
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub file_id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// External storage/embedding backend consumed by the ingestion pipeline.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait StorageService: Send + Sync {
    /// Store raw bytes, returning an opaque storage reference.
    fn upload_bytes(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;

    /// Index a stored document, returning the indexed entry id.
    fn process_document(
        &self,
        storage_ref: &str,
    ) -> impl Future<Output = Result<String, ProcessingError>> + Send;
}

/// Object-safe version of [`StorageService`] with boxed futures.
pub trait StorageServiceDyn: Send + Sync {
    fn upload_bytes_boxed<'a>(
        &'a self,
        bytes: &'a [u8],
        metadata: &'a UploadMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>>;

    fn process_document_boxed<'a>(
        &'a self,
        storage_ref: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProcessingError>> + Send + 'a>>;
}

impl<T: StorageService> StorageServiceDyn for T {
    fn upload_bytes_boxed<'a>(
        &'a self,
        bytes: &'a [u8],
        metadata: &'a UploadMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<String, UploadError>> + Send + 'a>> {
        Box::pin(self.upload_bytes(bytes, metadata))
    }

    fn process_document_boxed<'a>(
        &'a self,
        storage_ref: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProcessingError>> + Send + 'a>> {
        Box::pin(self.process_document(storage_ref))
    }
}

/// Type-erased storage service for runtime backend selection.
///
/// Since `StorageService` uses RPITIT it cannot be a trait object directly;
/// this wrapper delegates to the boxed-future `StorageServiceDyn` and
/// implements `StorageService` itself so it plugs into generic components.
pub struct BoxStorageService {
    inner: Box<dyn StorageServiceDyn>,
}

impl BoxStorageService {
    pub fn new<T: StorageService + 'static>(service: T) -> Self {
        Self {
            inner: Box::new(service),
        }
    }
}

impl StorageService for BoxStorageService {
    async fn upload_bytes(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> Result<String, UploadError> {
        self.inner.upload_bytes_boxed(bytes, metadata).await
    }

    async fn process_document(&self, storage_ref: &str) -> Result<String, ProcessingError> {
        self.inner.process_document_boxed(storage_ref).await
    }
}
