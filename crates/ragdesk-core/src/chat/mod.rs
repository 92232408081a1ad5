//! Chat sessions and the conversation engine.
//!
//! The `SessionStore` owns every session and its transcript; the
//! `ConversationEngine` sends user messages and resolves replies through the
//! `AnswerService` port, one outstanding request per session.

pub mod answer;
pub mod engine;
pub mod repository;
pub mod store;

pub use answer::{Answer, AnswerRequest, AnswerService, BoxAnswerService};
pub use engine::ConversationEngine;
pub use repository::{BoxSessionRepository, SessionRepository};
pub use store::SessionStore;
