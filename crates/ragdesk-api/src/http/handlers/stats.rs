//! Dashboard statistics endpoint.
//!
//! GET /api/v1/stats - Aggregate counts across ingestion and chat.

use axum::extract::State;

use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::{AppState, Stats};

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResponse<Stats> {
    let timer = RequestTimer::start();
    let stats = state.stats().await;
    timer
        .finish(stats)
        .with_link("self", "/api/v1/stats")
        .with_link("files", "/api/v1/files")
        .with_link("sessions", "/api/v1/sessions")
}
