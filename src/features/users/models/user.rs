use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for an account
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    /// Upload ceiling in bytes
    pub max_upload_size: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
