use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::shared::constants::ROLE_ADMIN;

/// Caller identity placed in request extensions by the auth middleware
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub session_id: Uuid,
    /// Upload ceiling in bytes at the time the request was authenticated
    pub max_upload_size: i64,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

/// Claims carried by locally issued access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Numeric user id
    pub uid: i64,
    /// Session row id
    pub sid: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Row returned when resolving a session back to its user
#[derive(Debug, Clone, FromRow)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub max_upload_size: i64,
}
