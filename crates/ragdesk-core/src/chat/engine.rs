//! Conversation engine: sends user messages and resolves assistant replies.
//!
//! At most one reply request is outstanding per session, tracked in a
//! `DashMap` of pending entries. Each request runs on its own task with a
//! `CancellationToken`; abandoning the session cancels it, and the token is
//! re-checked under the session lock right before the reply is appended so
//! a cancelled reply never reaches the transcript.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ragdesk_types::chat::NewMessage;
use ragdesk_types::error::{AnswerError, ChatError, SessionError, ValidationError};
use ragdesk_types::event::{CoreEvent, ReplyOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::answer::{AnswerRequest, AnswerService};
use super::repository::SessionRepository;
use super::store::SessionStore;
use crate::event::EventBus;

struct PendingReply {
    request_id: Uuid,
    token: CancellationToken,
}

struct EngineInner<R, A> {
    store: Arc<SessionStore<R>>,
    answers: A,
    pending: DashMap<Uuid, PendingReply>,
    events: EventBus,
    reply_timeout: Duration,
}

pub struct ConversationEngine<R, A> {
    inner: Arc<EngineInner<R, A>>,
    shutdown: CancellationToken,
}

impl<R, A> ConversationEngine<R, A>
where
    R: SessionRepository + 'static,
    A: AnswerService + 'static,
{
    pub fn new(store: Arc<SessionStore<R>>, answers: A, events: EventBus) -> Self {
        let reply_timeout = store.settings().reply_timeout();
        Self {
            inner: Arc::new(EngineInner {
                store,
                answers,
                pending: DashMap::new(),
                events,
                reply_timeout,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore<R>> {
        &self.inner.store
    }

    /// Append a user message and request a reply in the background.
    ///
    /// Returns the id of the appended user message. Blank text is rejected
    /// without touching the session, as is a send while a reply is pending.
    ///
    /// Answer failures and timeouts normally land in the transcript as an
    /// error-kind assistant message. If that append itself fails to persist,
    /// the transcript shows nothing and the only trace is
    /// `CoreEvent::ReplyResolved` with `ReplyOutcome::Failed`; callers that
    /// render replies should surface that outcome themselves.
    pub async fn send_user_message(&self, session_id: Uuid, text: &str) -> Result<Uuid, ChatError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        if !self.inner.store.contains(&session_id) {
            return Err(SessionError::NotFound(session_id).into());
        }

        let request_id = Uuid::now_v7();
        let token = self.shutdown.child_token();
        match self.inner.pending.entry(session_id) {
            Entry::Occupied(_) => return Err(ChatError::ReplyPending(session_id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingReply {
                    request_id,
                    token: token.clone(),
                });
            }
        }

        let message = match self
            .inner
            .store
            .append_message(session_id, NewMessage::user(query))
            .await
        {
            Ok(message) => message,
            Err(err) => {
                self.inner.clear_pending(session_id, request_id);
                return Err(err.into());
            }
        };

        info!(session_id = %session_id, request_id = %request_id, "Reply requested");
        self.inner.events.publish(CoreEvent::ReplyPending {
            session_id,
            request_id,
        });

        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let query_id = message.id;
        let span = info_span!("reply", session_id = %session_id, request_id = %request_id);
        tokio::spawn(
            async move {
                inner
                    .resolve(session_id, request_id, query_id, query, token)
                    .await;
            }
            .instrument(span),
        );

        Ok(message.id)
    }

    pub fn is_awaiting_reply(&self, session_id: &Uuid) -> bool {
        self.inner.pending.contains_key(session_id)
    }

    /// Cancel the session's pending reply, if any. Its eventual result is
    /// discarded. Returns `true` if a reply was pending.
    pub fn abandon_session(&self, session_id: &Uuid) -> bool {
        let Some((_, pending)) = self.inner.pending.remove(session_id) else {
            return false;
        };
        pending.token.cancel();
        info!(session_id = %session_id, request_id = %pending.request_id, "Pending reply cancelled");
        self.inner.events.publish(CoreEvent::ReplyResolved {
            session_id: *session_id,
            request_id: pending.request_id,
            outcome: ReplyOutcome::Cancelled,
        });
        true
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Cancel every pending reply.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let sessions: Vec<Uuid> = self.inner.pending.iter().map(|e| *e.key()).collect();
        for session_id in sessions {
            self.abandon_session(&session_id);
        }
    }
}

impl<R, A> Drop for ConversationEngine<R, A> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<R: SessionRepository, A: AnswerService> EngineInner<R, A> {
    fn clear_pending(&self, session_id: Uuid, request_id: Uuid) -> bool {
        self.pending
            .remove_if(&session_id, |_, pending| pending.request_id == request_id)
            .is_some()
    }

    async fn resolve(
        &self,
        session_id: Uuid,
        request_id: Uuid,
        query_id: Uuid,
        query: String,
        token: CancellationToken,
    ) {
        let outcome = self.reply(session_id, query_id, query, &token).await;

        // An abandoned request was already cleared and announced.
        if self.clear_pending(session_id, request_id) {
            info!(session_id = %session_id, request_id = %request_id, outcome = ?outcome, "Reply resolved");
            self.events.publish(CoreEvent::ReplyResolved {
                session_id,
                request_id,
                outcome,
            });
        }
    }

    async fn reply(
        &self,
        session_id: Uuid,
        query_id: Uuid,
        query: String,
        token: &CancellationToken,
    ) -> ReplyOutcome {
        let history = match self.store.messages(&session_id).await {
            Ok(messages) => messages.into_iter().filter(|m| m.id != query_id).collect(),
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Could not read history for reply");
                return ReplyOutcome::Failed;
            }
        };
        let request = AnswerRequest {
            session_id,
            history,
            query,
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return ReplyOutcome::Cancelled,
            result = tokio::time::timeout(self.reply_timeout, self.answers.answer(&request)) => {
                result.unwrap_or(Err(AnswerError::Timeout(self.reply_timeout)))
            }
        };

        let (message, outcome) = match result {
            Ok(answer) => (
                NewMessage::assistant(answer.content, answer.sources),
                ReplyOutcome::Answered,
            ),
            Err(AnswerError::Timeout(after)) => {
                warn!(session_id = %session_id, timeout = ?after, "Answer service timed out");
                (
                    NewMessage::error_notice(
                        "The assistant took too long to respond. Please try again.",
                    ),
                    ReplyOutcome::TimedOut,
                )
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Answer service failed");
                (
                    NewMessage::error_notice(format!(
                        "Sorry, I couldn't get an answer right now ({err}). Please try again."
                    )),
                    ReplyOutcome::Failed,
                )
            }
        };

        match self
            .store
            .append_message_if(session_id, message, || !token.is_cancelled())
            .await
        {
            Ok(Some(_)) => outcome,
            Ok(None) => ReplyOutcome::Cancelled,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "Could not append reply");
                ReplyOutcome::Failed
            }
        }
    }
}
