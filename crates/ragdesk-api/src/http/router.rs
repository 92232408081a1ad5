//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Ingestion
        .route(
            "/files",
            post(handlers::file::upload_file).get(handlers::file::list_files),
        )
        .route(
            "/files/{id}",
            get(handlers::file::get_file).delete(handlers::file::delete_file),
        )
        // Knowledge bases
        .route(
            "/knowledge-bases",
            post(handlers::knowledge_base::create_knowledge_base)
                .get(handlers::knowledge_base::list_knowledge_bases),
        )
        .route(
            "/knowledge-bases/{id}",
            get(handlers::knowledge_base::get_knowledge_base),
        )
        // Sessions
        .route(
            "/sessions",
            post(handlers::session::create_session).get(handlers::session::list_sessions),
        )
        .route("/sessions/{id}", get(handlers::session::get_session))
        .route(
            "/sessions/{id}/messages",
            get(handlers::session::get_messages).post(handlers::session::send_message),
        )
        .route("/sessions/{id}/pending", get(handlers::session::get_pending))
        .route("/sessions/{id}/abandon", post(handlers::session::abandon))
        // Dashboard stats
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_req(name: &str, mime: &str, bytes: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/files?name={name}"))
            .header("content-type", mime)
            .body(Body::from(bytes))
            .unwrap()
    }

    async fn wait_for(app: &Router, uri: &str, done: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..250 {
            let (_, body) = send(app, get_req(uri)).await;
            if done(&body) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition on {uri} never became true");
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);
        let (status, body) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_file_upload_completes() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let (status, body) = send(&app, upload_req("notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["name"], "notes.txt");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let done = wait_for(&app, &format!("/api/v1/files/{id}"), |b| {
            b["data"]["status"] == "completed"
        })
        .await;
        assert_eq!(done["data"]["progress"], 100);

        let (_, list) = send(&app, get_req("/api/v1/files")).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);

        let (status, removed) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/files/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(removed["data"]["removed"], true);

        let (status, _) = send(&app, get_req(&format!("/api/v1/files/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_upload_rejects_unsupported_type() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let (status, body) = send(&app, upload_req("photo.png", "image/png", b"\x89PNG")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");

        let (_, list) = send(&app, get_req("/api/v1/files")).await;
        assert!(list["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_uuid_is_bad_request() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);
        let (status, _) = send(&app, get_req("/api/v1/files/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_files_filters_by_status() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let (_, body) = send(&app, upload_req("faq.txt", "text/plain", b"faq")).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        wait_for(&app, &format!("/api/v1/files/{id}"), |b| {
            b["data"]["status"] == "completed"
        })
        .await;

        let (status, completed) = send(&app, get_req("/api/v1/files?status=Completed")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["data"].as_array().unwrap().len(), 1);

        let (_, failed) = send(&app, get_req("/api/v1/files?status=error")).await;
        assert!(failed["data"].as_array().unwrap().is_empty());

        let (status, body) = send(&app, get_req("/api/v1/files?status=done")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_knowledge_base_requires_known_files() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/v1/knowledge-bases",
                json!({ "name": "Policies", "file_ids": [uuid::Uuid::now_v7()] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "UNKNOWN_FILE");

        let (_, upload) = send(&app, upload_req("a.txt", "text/plain", b"a")).await;
        let file_id = upload["data"]["id"].clone();
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/v1/knowledge-bases",
                json!({ "name": "Policies", "file_ids": [file_id] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "Policies");

        let (_, list) = send(&app, get_req("/api/v1/knowledge-bases")).await;
        assert_eq!(list["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let (status, created) = send(
            &app,
            json_req(Method::POST, "/api/v1/sessions", json!({ "name": "Refunds" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let messages_uri = format!("/api/v1/sessions/{id}/messages");

        let (status, sent) = send(
            &app,
            json_req(Method::POST, &messages_uri, json!({ "content": "What is the policy?" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(sent["data"]["awaiting_reply"], true);

        let (status, body) = send(
            &app,
            json_req(Method::POST, &messages_uri, json!({ "content": "Hello?" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"][0]["code"], "REPLY_PENDING");

        wait_for(&app, &format!("/api/v1/sessions/{id}/pending"), |b| {
            b["data"]["awaiting_reply"] == false
        })
        .await;

        let (_, transcript) = send(&app, get_req(&messages_uri)).await;
        let messages = transcript["data"].as_array().unwrap();
        // welcome, question, answer
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["sender"], "user");
        assert_eq!(messages[2]["sender"], "assistant");
        assert_eq!(messages[2]["sources"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);
        let (_, list) = send(&app, get_req("/api/v1/sessions")).await;
        let id = list["data"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            json_req(
                Method::POST,
                &format!("/api/v1/sessions/{id}/messages"),
                json!({ "content": "   " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, transcript) = send(&app, get_req(&format!("/api/v1/sessions/{id}/messages"))).await;
        assert_eq!(transcript["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);
        let id = uuid::Uuid::now_v7();
        let (status, _) = send(&app, get_req(&format!("/api/v1/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            json_req(Method::POST, &format!("/api/v1/sessions/{id}/abandon"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);
        let (status, body) = send(&app, get_req("/api/v1/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sessions"], 1);
        assert_eq!(body["data"]["messages"], 1);
        assert_eq!(body["data"]["total_files"], 0);
        assert_eq!(body["data"]["pending_replies"], 0);
    }
}
