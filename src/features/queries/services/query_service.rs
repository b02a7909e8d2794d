use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::services::FileService;
use crate::features::memory::MemoryStore;
use crate::features::queries::dtos::{
    QueryListParams, QueryRecordDto, QueryRequestDto, QueryResponseDto,
};
use crate::features::queries::models::Query;
use crate::features::queries::services::assistant::{Assistant, AssistantRequest};
use crate::features::queries::services::reference_reader::{ReferenceDocument, ReferenceReader};
use crate::shared::constants::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

const QUERY_COLUMNS: &str = "id, user_id, chat_id, query_text, response, model, created_at";

/// Records queries and runs them through the assistant
pub struct QueryService {
    pool: PgPool,
    assistant: Assistant,
    references: ReferenceReader,
    memory: Arc<MemoryStore>,
    files: Arc<FileService>,
    default_model: String,
}

impl QueryService {
    pub fn new(
        pool: PgPool,
        assistant: Assistant,
        references: ReferenceReader,
        memory: Arc<MemoryStore>,
        files: Arc<FileService>,
        default_model: String,
    ) -> Self {
        Self {
            pool,
            assistant,
            references,
            memory,
            files,
            default_model,
        }
    }

    pub async fn ask(
        &self,
        user: &AuthenticatedUser,
        dto: QueryRequestDto,
    ) -> Result<QueryResponseDto> {
        let query = dto
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AppError::Validation("Query is required".to_string()))?;
        let chat_id = dto.chat_id.filter(|c| !c.is_empty());
        let model = dto
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let query_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queries (user_id, chat_id, query_text, model)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user.user_id)
        .bind(chat_id.as_deref())
        .bind(&query)
        .bind(&model)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = user.user_id, query_id, "Processing query");

        let references = self.collect_references(user.user_id).await;

        let request = AssistantRequest {
            user_id: user.user_id,
            username: user.username.clone(),
            query_id,
            query: query.clone(),
            chat_id: chat_id.clone(),
            model,
            max_tokens: dto.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: dto.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            update_memory: dto.update_memory.unwrap_or(true),
        };

        let reply = self
            .assistant
            .answer(&request, &references)
            .await
            .inspect_err(|e| warn!(query_id, "Query failed: {}", e))?;

        sqlx::query("UPDATE queries SET response = $1 WHERE id = $2")
            .bind(&reply.response)
            .bind(query_id)
            .execute(&self.pool)
            .await?;

        Ok(QueryResponseDto {
            response: reply.response,
            query,
            chat_id,
            query_id,
        })
    }

    /// Shared and per-user reference directories plus tagged uploads
    async fn collect_references(&self, user_id: i64) -> Vec<ReferenceDocument> {
        let uploads = match self.files.reference_files(user_id).await {
            Ok(uploads) => uploads,
            Err(e) => {
                warn!(user_id, "Failed to load reference uploads: {}", e);
                Vec::new()
            }
        };
        self.references
            .collect(&self.memory.references_dir(user_id), uploads)
            .await
    }

    /// The caller's queries, newest first
    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        params: &QueryListParams,
    ) -> Result<(Vec<QueryRecordDto>, i64)> {
        let chat_id = params.chat_id.as_deref().filter(|c| !c.is_empty());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queries WHERE user_id = $1 AND ($2::TEXT IS NULL OR chat_id = $2)",
        )
        .bind(user.user_id)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;

        let queries = sqlx::query_as::<_, Query>(&format!(
            r#"
            SELECT {}
            FROM queries
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR chat_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            QUERY_COLUMNS
        ))
        .bind(user.user_id)
        .bind(chat_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((queries.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get(&self, user: &AuthenticatedUser, query_id: i64) -> Result<QueryRecordDto> {
        let query = sqlx::query_as::<_, Query>(&format!(
            "SELECT {} FROM queries WHERE id = $1",
            QUERY_COLUMNS
        ))
        .bind(query_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Query not found".to_string()))?;

        if query.user_id != user.user_id {
            return Err(AppError::Forbidden(
                "Not authorized to access this query".to_string(),
            ));
        }

        Ok(query.into())
    }
}
