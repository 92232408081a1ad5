//! In-process stand-in for the storage/embedding service.

use std::time::Duration;

use dashmap::DashMap;
use ragdesk_core::ingest::storage::{StorageService, UploadMetadata};
use ragdesk_types::config::{IngestSettings, StorageSettings};
use ragdesk_types::error::{ProcessingError, UploadError};
use uuid::Uuid;

/// Accepts uploads after a fixed latency and "indexes" them immediately.
///
/// Enforces the configured size limit and mime allow-list, so oversized
/// files end up in `Error` just as they would against a real backend.
///
/// An upload is held only until it is processed. Uploads whose file is
/// removed before processing starts stay held for the life of the service.
pub struct SimulatedStorageService {
    latency: Duration,
    max_file_size_bytes: u64,
    allowed_mime_types: Vec<String>,
    stored: DashMap<String, UploadMetadata>,
}

impl SimulatedStorageService {
    pub fn new(storage: &StorageSettings, ingest: &IngestSettings) -> Self {
        Self {
            latency: Duration::from_millis(storage.simulated_latency_ms),
            max_file_size_bytes: ingest.max_file_size_bytes,
            allowed_mime_types: ingest.allowed_mime_types.clone(),
            stored: DashMap::new(),
        }
    }

    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }
}

impl StorageService for SimulatedStorageService {
    async fn upload_bytes(
        &self,
        bytes: &[u8],
        metadata: &UploadMetadata,
    ) -> Result<String, UploadError> {
        tokio::time::sleep(self.latency).await;

        let size = bytes.len() as u64;
        if size > self.max_file_size_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_file_size_bytes,
            });
        }
        if !self
            .allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&metadata.mime_type))
        {
            return Err(UploadError::UnsupportedType(metadata.mime_type.clone()));
        }

        let storage_ref = format!("sim://{}", metadata.file_id);
        self.stored.insert(storage_ref.clone(), metadata.clone());
        tracing::debug!(file_id = %metadata.file_id, storage_ref = %storage_ref, "Simulated upload stored");
        Ok(storage_ref)
    }

    async fn process_document(&self, storage_ref: &str) -> Result<String, ProcessingError> {
        tokio::time::sleep(self.latency).await;

        let Some((_, metadata)) = self.stored.remove(storage_ref) else {
            return Err(ProcessingError::ProcessingFailed(format!(
                "unknown storage reference '{storage_ref}'"
            )));
        };
        let entry_id = format!("idx-{}", Uuid::now_v7());
        tracing::debug!(file_id = %metadata.file_id, entry_id = %entry_id, "Simulated document indexed");
        Ok(entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(max: u64) -> SimulatedStorageService {
        let ingest = IngestSettings {
            max_file_size_bytes: max,
            ..Default::default()
        };
        SimulatedStorageService::new(&StorageSettings::default(), &ingest)
    }

    fn metadata(mime: &str, size: u64) -> UploadMetadata {
        UploadMetadata {
            file_id: Uuid::now_v7(),
            name: "doc".to_string(),
            mime_type: mime.to_string(),
            size_bytes: size,
        }
    }

    #[tokio::test]
    async fn test_upload_then_process() {
        let svc = service(1024);
        let meta = metadata("application/pdf", 4);
        let storage_ref = svc.upload_bytes(&[1, 2, 3, 4], &meta).await.unwrap();
        assert_eq!(storage_ref, format!("sim://{}", meta.file_id));
        assert_eq!(svc.stored_count(), 1);

        let entry = svc.process_document(&storage_ref).await.unwrap();
        assert!(entry.starts_with("idx-"));
        assert_eq!(svc.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_processed_upload_is_released() {
        let svc = service(1024);
        let first = svc
            .upload_bytes(&[1], &metadata("text/plain", 1))
            .await
            .unwrap();
        let second = svc
            .upload_bytes(&[2], &metadata("text/plain", 1))
            .await
            .unwrap();
        assert_eq!(svc.stored_count(), 2);

        svc.process_document(&first).await.unwrap();
        assert_eq!(svc.stored_count(), 1);

        // A processed reference cannot be indexed twice.
        assert!(svc.process_document(&first).await.is_err());
        svc.process_document(&second).await.unwrap();
        assert_eq!(svc.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_too_large() {
        let svc = service(2);
        let err = svc
            .upload_bytes(&[0; 3], &metadata("text/plain", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 3, max: 2 }));
    }

    #[tokio::test]
    async fn test_disallowed_mime_is_unsupported() {
        let svc = service(1024);
        let err = svc
            .upload_bytes(&[0; 3], &metadata("image/gif", 3))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(ref m) if m == "image/gif"));
    }

    #[tokio::test]
    async fn test_processing_unknown_ref_fails() {
        let svc = service(1024);
        let err = svc.process_document("sim://missing").await.unwrap_err();
        assert!(err.to_string().contains("unknown storage reference"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let storage = StorageSettings {
            simulated_latency_ms: 250,
            ..Default::default()
        };
        let svc = SimulatedStorageService::new(&storage, &IngestSettings::default());
        let start = tokio::time::Instant::now();
        svc.upload_bytes(&[1], &metadata("text/plain", 1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
