use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::queries::models::Query;
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QueryRequestDto {
    /// The question for the assistant
    pub query: Option<String>,

    /// Groups queries into one conversation
    pub chat_id: Option<String>,

    /// Overrides the configured default model
    pub model: Option<String>,

    #[validate(range(min = 1, max = 4096))]
    #[schema(minimum = 1, maximum = 4096)]
    pub max_tokens: Option<u32>,

    #[validate(range(min = 0.0, max = 2.0))]
    #[schema(minimum = 0.0, maximum = 2.0)]
    pub temperature: Option<f32>,

    /// Summarise the exchange into short-term memory (default true)
    pub update_memory: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponseDto {
    pub response: String,
    pub query: String,
    pub chat_id: Option<String>,
    pub query_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryRecordDto {
    pub id: i64,
    pub chat_id: Option<String>,
    pub query: String,
    pub response: Option<String>,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl From<Query> for QueryRecordDto {
    fn from(query: Query) -> Self {
        Self {
            id: query.id,
            chat_id: query.chat_id,
            query: query.query_text,
            response: query.response,
            model: query.model,
            created_at: query.created_at,
        }
    }
}

// Query params for listing past queries
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct QueryListParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,

    /// Only queries from this conversation
    pub chat_id: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl QueryListParams {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(max_tokens: Option<u32>, temperature: Option<f32>) -> QueryRequestDto {
        QueryRequestDto {
            query: Some("hi".to_string()),
            chat_id: None,
            model: None,
            max_tokens,
            temperature,
            update_memory: None,
        }
    }

    #[test]
    fn test_bounds() {
        assert!(request(None, None).validate().is_ok());
        assert!(request(Some(4096), Some(2.0)).validate().is_ok());
        assert!(request(Some(0), None).validate().is_err());
        assert!(request(Some(4097), None).validate().is_err());
        assert!(request(None, Some(-0.1)).validate().is_err());
        assert!(request(None, Some(2.5)).validate().is_err());
    }

    #[test]
    fn test_list_params_clamp() {
        let params = QueryListParams {
            page: 3,
            page_size: 500,
            chat_id: None,
        };
        assert_eq!(params.limit(), MAX_PAGE_SIZE);
        assert_eq!(params.offset(), 2 * MAX_PAGE_SIZE);
    }
}
