//! Ingestion pipeline: registers files and drives each through its stages.
//!
//! Every enqueued file gets its own spawned task and its own
//! `CancellationToken` (a child of the pipeline's shutdown token). The task
//! is the only writer of that file's `status`/`progress`, and every write
//! happens through [`Shared::apply`], which checks the token while holding
//! the file's map entry. `remove` cancels before it deletes, so once a
//! `FileRemoved` event is published nothing else is ever published for that
//! file.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use ragdesk_types::config::IngestSettings;
use ragdesk_types::error::{IngestError, ValidationError};
use ragdesk_types::event::CoreEvent;
use ragdesk_types::file::{
    FileDescriptor, FileStatus, FileStatusCounts, IngestFile, PROGRESS_COMPLETE,
};
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::progress::{advance, pending_ceiling, transition};
use super::storage::{StorageService, UploadMetadata};
use crate::event::EventBus;

struct FileEntry {
    seq: u64,
    file: IngestFile,
}

/// How a single stage ended.
enum StageOutcome<T> {
    Done(T),
    Failed,
    Cancelled,
}

struct Shared<S> {
    files: DashMap<Uuid, FileEntry>,
    tokens: DashMap<Uuid, CancellationToken>,
    storage: S,
    settings: IngestSettings,
    events: EventBus,
}

/// Owns the file listing and the per-file progression tasks.
pub struct IngestPipeline<S> {
    shared: Arc<Shared<S>>,
    next_seq: AtomicU64,
    shutdown: CancellationToken,
}

impl<S: StorageService + 'static> IngestPipeline<S> {
    pub fn new(storage: S, settings: IngestSettings, events: EventBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                files: DashMap::new(),
                tokens: DashMap::new(),
                storage,
                settings,
                events,
            }),
            next_seq: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.shared.settings
    }

    /// Register one file per descriptor at `Queued` and start their tasks.
    ///
    /// All descriptors are validated before anything is registered; a single
    /// bad descriptor rejects the whole batch. Must be called from within a
    /// tokio runtime.
    pub fn enqueue(&self, descriptors: Vec<FileDescriptor>) -> Result<Vec<Uuid>, IngestError> {
        if descriptors.is_empty() {
            return Err(ValidationError::NoFiles.into());
        }
        for descriptor in &descriptors {
            self.validate(descriptor)?;
        }

        let mut ids = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let file = IngestFile::queued(&descriptor);
            let file_id = file.id;
            let token = self.shutdown.child_token();
            let metadata = UploadMetadata {
                file_id,
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                size_bytes: file.size_bytes,
            };

            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            self.shared.tokens.insert(file_id, token.clone());
            self.shared.files.insert(
                file_id,
                FileEntry {
                    seq,
                    file: file.clone(),
                },
            );
            info!(file_id = %file_id, name = %file.name, size_bytes = file.size_bytes, "File queued");
            self.shared.events.publish(CoreEvent::FileQueued { file });

            let shared = Arc::clone(&self.shared);
            let span = info_span!("ingest_file", file_id = %file_id);
            tokio::spawn(
                async move {
                    shared
                        .run(file_id, descriptor.bytes, metadata, token)
                        .await;
                }
                .instrument(span),
            );
            ids.push(file_id);
        }
        Ok(ids)
    }

    fn validate(&self, descriptor: &FileDescriptor) -> Result<(), ValidationError> {
        if descriptor.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if descriptor.bytes.is_empty() {
            return Err(ValidationError::EmptyFile(descriptor.name.clone()));
        }
        if !self.shared.settings.is_allowed_mime(&descriptor.mime_type) {
            return Err(ValidationError::UnsupportedType {
                name: descriptor.name.clone(),
                mime_type: descriptor.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// Snapshot of all files in insertion order.
    pub fn list(&self) -> Vec<IngestFile> {
        let mut entries: Vec<(u64, IngestFile)> = self
            .shared
            .files
            .iter()
            .map(|entry| (entry.seq, entry.file.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, file)| file).collect()
    }

    pub fn get(&self, file_id: &Uuid) -> Option<IngestFile> {
        self.shared.files.get(file_id).map(|entry| entry.file.clone())
    }

    pub fn contains(&self, file_id: &Uuid) -> bool {
        self.shared.files.contains_key(file_id)
    }

    /// Cancel the file's task (if any) and drop it from the listing.
    ///
    /// Returns `true` if an entry existed. Unknown or already-removed ids
    /// are a no-op.
    pub fn remove(&self, file_id: &Uuid) -> bool {
        if let Some((_, token)) = self.shared.tokens.remove(file_id) {
            token.cancel();
        }
        let removed = self.shared.files.remove(file_id).is_some();
        if removed {
            info!(file_id = %file_id, "File removed");
            self.shared
                .events
                .publish(CoreEvent::FileRemoved { file_id: *file_id });
        }
        removed
    }

    pub fn status_counts(&self) -> FileStatusCounts {
        let mut counts = FileStatusCounts::default();
        for entry in self.shared.files.iter() {
            counts.record(entry.file.status);
        }
        counts
    }

    /// Cancel every in-flight progression task. Files keep their last state.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl<S> Drop for IngestPipeline<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<S: StorageService> Shared<S> {
    /// Mutate a file under its entry lock, unless the task was cancelled.
    ///
    /// The closure may return an event, which is published before the lock
    /// is released. Returns `false` when the task should stop.
    fn apply<F>(&self, file_id: Uuid, token: &CancellationToken, mutate: F) -> bool
    where
        F: FnOnce(&mut IngestFile) -> Option<CoreEvent>,
    {
        let Some(mut entry) = self.files.get_mut(&file_id) else {
            return false;
        };
        if token.is_cancelled() {
            return false;
        }
        if let Some(event) = mutate(&mut entry.file) {
            self.events.publish(event);
        }
        true
    }

    fn enter(&self, file_id: Uuid, token: &CancellationToken, next: FileStatus) -> bool {
        self.apply(file_id, token, |file| status_changed(file, next))
    }

    async fn run(
        &self,
        file_id: Uuid,
        bytes: Vec<u8>,
        metadata: UploadMetadata,
        token: CancellationToken,
    ) {
        self.progress(file_id, &bytes, &metadata, &token).await;
        self.tokens.remove(&file_id);
    }

    async fn progress(
        &self,
        file_id: Uuid,
        bytes: &[u8],
        metadata: &UploadMetadata,
        token: &CancellationToken,
    ) {
        let upload = self.storage.upload_bytes(bytes, metadata);
        let storage_ref = match self
            .stage(file_id, token, FileStatus::Uploading, self.settings.upload_tick(), upload)
            .await
        {
            StageOutcome::Done(storage_ref) => storage_ref,
            StageOutcome::Failed | StageOutcome::Cancelled => return,
        };
        let recorded = self.apply(file_id, token, |file| {
            file.storage_ref = Some(storage_ref.clone());
            None
        });
        if !recorded || !self.pause(token).await {
            return;
        }

        let process = self.storage.process_document(&storage_ref);
        let entry_id = match self
            .stage(file_id, token, FileStatus::Processing, self.settings.process_tick(), process)
            .await
        {
            StageOutcome::Done(entry_id) => entry_id,
            StageOutcome::Failed | StageOutcome::Cancelled => return,
        };
        let recorded = self.apply(file_id, token, |file| {
            file.indexed_entry_id = Some(entry_id);
            None
        });
        if !recorded || !self.pause(token).await {
            return;
        }

        if self.enter(file_id, token, FileStatus::Completed) {
            info!(file_id = %file_id, "File ingestion completed");
        }
    }

    /// Run one active stage: tick progress while the backend call is in
    /// flight, holding one step short of 100 until it resolves.
    async fn stage<T, E, Fut>(
        &self,
        file_id: Uuid,
        token: &CancellationToken,
        stage: FileStatus,
        tick: Duration,
        call: Fut,
    ) -> StageOutcome<T>
    where
        E: Display,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enter(file_id, token, stage) {
            return StageOutcome::Cancelled;
        }

        let step = self.settings.step();
        let held = pending_ceiling(step);
        let mut ticker = interval_at(Instant::now() + tick, tick);
        let mut outcome: Option<T> = None;
        tokio::pin!(call);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => return StageOutcome::Cancelled,

                result = &mut call, if outcome.is_none() => match result {
                    Ok(value) => outcome = Some(value),
                    Err(err) => {
                        let reason = err.to_string();
                        warn!(file_id = %file_id, stage = %stage, error = %reason, "Ingestion stage failed");
                        self.apply(file_id, token, |file| {
                            let event = status_changed(file, FileStatus::Error);
                            file.error = Some(reason);
                            event
                        });
                        return StageOutcome::Failed;
                    }
                },

                _ = ticker.tick() => {
                    let ceiling = if outcome.is_some() { PROGRESS_COMPLETE } else { held };
                    let mut finished = false;
                    let alive = self.apply(file_id, token, |file| {
                        let moved = advance(file, step, ceiling);
                        finished = file.progress >= PROGRESS_COMPLETE;
                        moved.then(|| {
                            debug!(file_id = %file_id, status = %file.status, progress = file.progress, "Progress tick");
                            CoreEvent::FileProgress {
                                file_id,
                                status: file.status,
                                progress: file.progress,
                            }
                        })
                    });
                    if !alive {
                        return StageOutcome::Cancelled;
                    }
                    if finished {
                        if let Some(value) = outcome.take() {
                            return StageOutcome::Done(value);
                        }
                    }
                }
            }
        }
    }

    /// Pause between stages. Returns `false` if cancelled meanwhile.
    async fn pause(&self, token: &CancellationToken) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.settings.stage_pause()) => true,
        }
    }
}

fn status_changed(file: &mut IngestFile, next: FileStatus) -> Option<CoreEvent> {
    match transition(file, next) {
        Ok(from) => {
            info!(file_id = %file.id, from = %from, to = %next, "File status changed");
            Some(CoreEvent::FileStatusChanged {
                file_id: file.id,
                from,
                to: next,
                file: file.clone(),
            })
        }
        Err(err) => {
            warn!(file_id = %file.id, error = %err, "Ignoring illegal transition");
            None
        }
    }
}
