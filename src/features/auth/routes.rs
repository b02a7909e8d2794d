use crate::features::auth::handlers;
use crate::features::auth::services::AuthService;
use axum::{routing::post, Router};
use std::sync::Arc;

/// Public auth routes (no authentication required)
pub fn public_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/token", post(handlers::login))
        .with_state(service)
}

/// Protected auth routes (require a bearer token)
pub fn protected_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/logout", post(handlers::logout))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AuthConfig;
    use crate::core::middleware::auth_middleware;
    use crate::modules::storage::LocalStore;
    use crate::shared::test_helpers::lazy_pool;
    use axum::middleware::from_fn_with_state;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use jsonwebtoken::Algorithm;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn service() -> Arc<AuthService> {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::from_secs(3600),
        };
        Arc::new(AuthService::new(
            lazy_pool(),
            &config,
            Arc::new(LocalStore::new(std::env::temp_dir().join("thoth-auth-tests"))),
            524_288_000,
        ))
    }

    fn server() -> TestServer {
        let service = service();
        let app = public_routes(service.clone()).merge(
            protected_routes(service.clone())
                .layer(from_fn_with_state(service, auth_middleware)),
        );
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let response = server()
            .post("/register")
            .json(&json!({"username": "ada", "password": "short"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_username() {
        let response = server()
            .post("/register")
            .json(&json!({"username": "1ada", "password": "testpass123"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_json() {
        let response = server()
            .post("/register")
            .content_type("application/json")
            .bytes("{not json".into())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_requires_form_fields() {
        let response = server()
            .post("/token")
            .form(&[("username", "ada")])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_rejects_unknown_grant_type() {
        let response = server()
            .post("/token")
            .form(&[
                ("username", "ada"),
                ("password", "testpass123"),
                ("grant_type", "client_credentials"),
            ])
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_without_token_is_unauthorized() {
        let response = server().post("/logout").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_with_forged_token_is_unauthorized() {
        let response = server()
            .post("/logout")
            .authorization_bearer("eyJhbGciOiJIUzI1NiJ9.e30.invalid")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Invalid credentials");
    }
}
