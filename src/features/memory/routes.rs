use crate::features::memory::handlers;
use crate::features::memory::services::MemoryStore;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

pub fn routes(store: Arc<MemoryStore>) -> Router {
    Router::new()
        .route("/memory", get(handlers::get_memory))
        .route("/memory/long-term", patch(handlers::update_long_term))
        .route("/memory/short-term", delete(handlers::clear_short_term))
        .route("/active_url", post(handlers::set_active_url))
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_test_user, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> TestServer {
        let store = Arc::new(MemoryStore::new(dir.path(), 100));
        TestServer::new(with_user(routes(store), create_test_user())).unwrap()
    }

    #[tokio::test]
    async fn test_get_memory_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir).get("/memory").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["short_term"]["conversations"], json!([]));
        assert_eq!(body["data"]["long_term"]["user_profile"], json!({}));
    }

    #[tokio::test]
    async fn test_patch_long_term_merges() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        server
            .patch("/memory/long-term")
            .json(&json!({"user_profile": {"name": "Ada"}}))
            .await
            .assert_status_ok();

        let body: Value = server.get("/memory").await.json();
        assert_eq!(body["data"]["long_term"]["user_profile"]["name"], "Ada");
        assert_eq!(body["data"]["long_term"]["preferences"], json!({}));
    }

    #[tokio::test]
    async fn test_patch_long_term_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir)
            .patch("/memory/long-term")
            .json(&json!(["not", "an", "object"]))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_active_url_requires_url() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        server
            .post("/active_url")
            .json(&json!({"title": "No url"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/active_url")
            .json(&json!({"url": "   "}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_active_url_is_stored() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let response = server
            .post("/active_url")
            .json(&json!({"url": "https://docs.rs", "title": "Docs"}))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({"status": "success"}));

        let body: Value = server.get("/memory").await.json();
        assert_eq!(
            body["data"]["short_term"]["active_url"]["url"],
            "https://docs.rs"
        );
    }

    #[tokio::test]
    async fn test_clear_short_term() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        server
            .post("/active_url")
            .json(&json!({"url": "https://docs.rs"}))
            .await
            .assert_status_ok();
        server
            .delete("/memory/short-term")
            .await
            .assert_status_ok();

        let body: Value = server.get("/memory").await.json();
        assert!(body["data"]["short_term"].get("active_url").is_none());
    }
}
