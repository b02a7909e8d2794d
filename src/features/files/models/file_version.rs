use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Archived prior content of a file
#[derive(Debug, Clone, FromRow)]
pub struct FileVersion {
    pub id: i64,
    pub file_id: i64,
    pub version_number: i32,
    pub size: i64,
    pub path: Option<String>,
    pub content_type: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}
