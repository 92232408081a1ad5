//! Canned answer service used when no real backend is configured.

use std::time::Duration;

use ragdesk_core::chat::answer::{Answer, AnswerRequest, AnswerService};
use ragdesk_types::chat::Citation;
use ragdesk_types::config::AnswerSettings;
use ragdesk_types::error::AnswerError;

const CANNED_REPLY: &str = "I understand your question. Based on the documents in your \
knowledge base, here's what I found:\n\nThis is a simulated response that would contain \
relevant information extracted from your uploaded documents. A retrieval backend would \
search through your documents and provide contextual answers with proper citations.";

/// Replies after a fixed delay with a canned answer citing the configured
/// source documents.
pub struct SimulatedAnswerService {
    delay: Duration,
    sources: Vec<String>,
}

impl SimulatedAnswerService {
    pub fn new(settings: &AnswerSettings) -> Self {
        Self {
            delay: Duration::from_millis(settings.simulated_delay_ms),
            sources: settings.simulated_sources.clone(),
        }
    }
}

impl AnswerService for SimulatedAnswerService {
    async fn answer(&self, request: &AnswerRequest) -> Result<Answer, AnswerError> {
        tracing::debug!(
            session_id = %request.session_id,
            history = request.history.len(),
            "Simulated answer requested"
        );
        tokio::time::sleep(self.delay).await;

        Ok(Answer {
            content: CANNED_REPLY.to_string(),
            sources: self.sources.iter().map(Citation::new).collect(),
        })
    }
}
