//! Registry of knowledge bases built from ingested files.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use ragdesk_types::error::{KnowledgeBaseError, ValidationError};
use ragdesk_types::event::CoreEvent;
use ragdesk_types::knowledge_base::KnowledgeBase;
use tracing::info;
use uuid::Uuid;

use super::pipeline::IngestPipeline;
use super::storage::StorageService;
use crate::event::EventBus;

/// Creates and lists knowledge bases. Entries are immutable once created.
pub struct KnowledgeBaseRegistry {
    entries: DashMap<Uuid, (u64, KnowledgeBase)>,
    next_seq: AtomicU64,
    events: EventBus,
}

impl KnowledgeBaseRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            events,
        }
    }

    /// Create a knowledge base over files currently known to `pipeline`.
    ///
    /// Files do not need to have finished ingestion.
    pub fn create<S: StorageService + 'static>(
        &self,
        pipeline: &IngestPipeline<S>,
        name: &str,
        description: &str,
        file_ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<KnowledgeBase, KnowledgeBaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let file_ids: BTreeSet<Uuid> = file_ids.into_iter().collect();
        if file_ids.is_empty() {
            return Err(ValidationError::NoFiles.into());
        }
        if let Some(unknown) = file_ids.iter().find(|id| !pipeline.contains(id)) {
            return Err(KnowledgeBaseError::UnknownFile(*unknown));
        }

        let knowledge_base = KnowledgeBase {
            id: Uuid::now_v7(),
            name: name.to_string(),
            description: description.trim().to_string(),
            file_ids,
            created_at: Utc::now(),
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(knowledge_base.id, (seq, knowledge_base.clone()));

        info!(
            knowledge_base_id = %knowledge_base.id,
            name = %knowledge_base.name,
            files = knowledge_base.file_ids.len(),
            "Knowledge base created"
        );
        self.events.publish(CoreEvent::KnowledgeBaseCreated {
            knowledge_base: knowledge_base.clone(),
        });
        Ok(knowledge_base)
    }

    /// All knowledge bases in creation order.
    pub fn list(&self) -> Vec<KnowledgeBase> {
        let mut entries: Vec<(u64, KnowledgeBase)> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, kb)| kb).collect()
    }

    pub fn get(&self, id: &Uuid) -> Result<KnowledgeBase, KnowledgeBaseError> {
        self.entries
            .get(id)
            .map(|e| e.value().1.clone())
            .ok_or(KnowledgeBaseError::NotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
