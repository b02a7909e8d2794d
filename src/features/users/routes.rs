use crate::features::users::handlers;
use crate::features::users::services::UserService;
use axum::{
    routing::{delete, get, patch},
    Router,
};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/user/{username}", delete(handlers::delete_user))
        .route(
            "/api/admin/users/{username}",
            patch(handlers::admin_update_user),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::memory::MemoryStore;
    use crate::modules::storage::LocalStore;
    use crate::shared::test_helpers::{create_test_user, lazy_pool, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn server(dir: &TempDir, role: &str) -> TestServer {
        let service = Arc::new(UserService::new(
            lazy_pool(),
            Arc::new(LocalStore::new(dir.path().join("assets"))),
            Arc::new(MemoryStore::new(dir.path().join("memory"), 100)),
        ));
        let mut user = create_test_user();
        user.role = role.to_string();
        TestServer::new(with_user(routes(service), user)).unwrap()
    }

    #[tokio::test]
    async fn test_cannot_delete_someone_else() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, "user").delete("/user/somebody_else").await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["message"], "You can only delete your own account.");
    }

    #[tokio::test]
    async fn test_admin_update_requires_admin() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, "user")
            .patch("/api/admin/users/someone")
            .json(&json!({"role": "admin"}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_unknown_role() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, "admin")
            .patch("/api/admin/users/someone")
            .json(&json!({"role": "superuser"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_empty_change() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, "admin")
            .patch("/api/admin/users/someone")
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_update_rejects_non_positive_quota() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, "admin")
            .patch("/api/admin/users/someone")
            .json(&json!({"max_upload_size": 0}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
