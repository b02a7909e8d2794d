use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for one assistant query
#[derive(Debug, Clone, FromRow)]
pub struct Query {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: Option<String>,
    pub query_text: String,
    /// Null until the completion succeeds
    pub response: Option<String>,
    pub model: String,
    pub created_at: DateTime<Utc>,
}
