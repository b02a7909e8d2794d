use crate::features::queries::handlers;
use crate::features::queries::services::QueryService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn routes(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/query", post(handlers::ask))
        .route("/queries", get(handlers::list_queries))
        .route("/queries/{query_id}", get(handlers::get_query))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StorageBackend;
    use crate::core::error::{AppError, Result};
    use crate::features::files::services::FileService;
    use crate::features::memory::MemoryStore;
    use crate::features::queries::services::{Assistant, ReferenceReader};
    use crate::modules::llm::{Completion, CompletionClient, CompletionRequest};
    use crate::modules::storage::LocalStore;
    use crate::shared::test_helpers::{create_test_user, lazy_pool, with_user};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct UnreachableClient;

    #[async_trait]
    impl CompletionClient for UnreachableClient {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            Err(AppError::ExternalServiceError("unreachable".to_string()))
        }
    }

    fn server(dir: &TempDir) -> TestServer {
        let pool = lazy_pool();
        let memory = Arc::new(MemoryStore::new(dir.path().join("memory"), 100));
        let files = Arc::new(FileService::new(
            pool.clone(),
            Arc::new(LocalStore::new(dir.path().join("assets"))),
            StorageBackend::Disk,
        ));
        let service = Arc::new(QueryService::new(
            pool,
            Assistant::new(Arc::new(UnreachableClient), memory.clone(), 5, 500),
            ReferenceReader::new(dir.path().join("references"), 12_000),
            memory,
            files,
            "gpt-3.5-turbo".to_string(),
        ));
        TestServer::new(with_user(routes(service), create_test_user())).unwrap()
    }

    #[tokio::test]
    async fn test_query_is_required() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir).post("/query").json(&json!({})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Query is required");
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir)
            .post("/query")
            .json(&json!({"query": "   "}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_max_tokens_out_of_range() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir)
            .post("/query")
            .json(&json!({"query": "hi", "max_tokens": 5000}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_temperature_out_of_range() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir)
            .post("/query")
            .json(&json!({"query": "hi", "temperature": 3.0}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir)
            .post("/query")
            .text("not json")
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
