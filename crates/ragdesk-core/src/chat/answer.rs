//! AnswerService trait definition and its dynamic-dispatch wrapper.

use std::future::Future;
use std::pin::Pin;

use ragdesk_types::chat::{ChatMessage, Citation};
use ragdesk_types::error::AnswerError;
use uuid::Uuid;

/// Input to one answer-generation call.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub session_id: Uuid,
    /// Transcript preceding the query, oldest first.
    pub history: Vec<ChatMessage>,
    pub query: String,
}

/// A generated reply and the documents it cites, in the service's order.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub content: String,
    pub sources: Vec<Citation>,
}

/// External answer-generation service consumed by the conversation engine.
///
/// Citation ranking and selection belong to the implementation.
pub trait AnswerService: Send + Sync {
    fn answer(
        &self,
        request: &AnswerRequest,
    ) -> impl Future<Output = Result<Answer, AnswerError>> + Send;
}

/// Object-safe version of [`AnswerService`] with a boxed future.
pub trait AnswerServiceDyn: Send + Sync {
    fn answer_boxed<'a>(
        &'a self,
        request: &'a AnswerRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Answer, AnswerError>> + Send + 'a>>;
}

impl<T: AnswerService> AnswerServiceDyn for T {
    fn answer_boxed<'a>(
        &'a self,
        request: &'a AnswerRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Answer, AnswerError>> + Send + 'a>> {
        Box::pin(self.answer(request))
    }
}

/// Type-erased answer service, chosen at runtime from configuration.
pub struct BoxAnswerService {
    inner: Box<dyn AnswerServiceDyn>,
}

impl BoxAnswerService {
    pub fn new<T: AnswerService + 'static>(service: T) -> Self {
        Self {
            inner: Box::new(service),
        }
    }
}

impl AnswerService for BoxAnswerService {
    async fn answer(&self, request: &AnswerRequest) -> Result<Answer, AnswerError> {
        self.inner.answer_boxed(request).await
    }
}
