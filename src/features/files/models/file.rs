use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for an uploaded file.
///
/// Bytes live either in the `content` column (selected separately) or at
/// `path` on disk, depending on the backend that stored them.
#[derive(Debug, Clone, FromRow)]
pub struct File {
    pub id: i64,
    pub owner_id: i64,
    pub filename: String,
    pub size: i64,
    pub path: Option<String>,
    pub content_type: String,
    /// Hex SHA-256 of the current content
    pub checksum: String,
    pub current_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
