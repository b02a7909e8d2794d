use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::features::users::models::User;

/// Caller's account plus the `user_profile` section of long-term memory
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponseDto {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub max_upload_size: i64,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub user_profile: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub max_upload_size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            max_upload_size: user.max_upload_size,
            created_at: user.created_at,
        }
    }
}

/// Admin change to another account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUserDto {
    #[validate(range(min = 1, message = "max_upload_size must be positive"))]
    pub max_upload_size: Option<i64>,

    /// `user` or `admin`
    pub role: Option<String>,
}
