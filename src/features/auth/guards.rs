//! Role-based authorization guards.
//!
//! Two roles exist: `user` (default for every registration) and `admin`,
//! which may change other accounts' upload quota and role.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for checking if user is an admin.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireAdmin(user): RequireAdmin) { ... }
/// ```
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(RequireAdmin(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_test_user, with_user};
    use axum::{http::StatusCode, routing::get, Router};
    use axum_test::TestServer;

    async fn admin_only(RequireAdmin(user): RequireAdmin) -> String {
        user.username
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let mut admin = create_test_user();
        admin.role = "admin".to_string();
        let app = with_user(Router::new().route("/", get(admin_only)), admin);

        let response = TestServer::new(app).unwrap().get("/").await;
        response.assert_status_ok();
        response.assert_text("test_user");
    }

    #[tokio::test]
    async fn test_regular_user_is_forbidden() {
        let app = with_user(
            Router::new().route("/", get(admin_only)),
            create_test_user(),
        );

        let response = TestServer::new(app).unwrap().get("/").await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let app = Router::new().route("/", get(admin_only));

        let response = TestServer::new(app).unwrap().get("/").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
