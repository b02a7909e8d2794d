use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::memory::dtos::{
    ActiveUrlRequestDto, LongTermPatchDto, MemoryDocumentDto, MemoryDto, StatusDto,
};
use crate::features::memory::services::{MemoryKind, MemoryStore};
use crate::shared::types::ApiResponse;
use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

/// Get the caller's short-term and long-term memory
#[utoipa::path(
    get,
    path = "/memory",
    responses(
        (status = 200, description = "Memory documents", body = ApiResponse<MemoryDto>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Memory document corrupted")
    ),
    tag = "memory",
    security(("bearer_auth" = []))
)]
pub async fn get_memory(
    user: AuthenticatedUser,
    State(store): State<Arc<MemoryStore>>,
) -> Result<Json<ApiResponse<MemoryDto>>> {
    let short_term = store.load(user.user_id, MemoryKind::ShortTerm).await?;
    let long_term = store.load(user.user_id, MemoryKind::LongTerm).await?;

    Ok(Json(ApiResponse::success(
        Some(MemoryDto {
            short_term: Value::Object(short_term),
            long_term: Value::Object(long_term),
        }),
        None,
        None,
    )))
}

/// Merge top-level keys into long-term memory
#[utoipa::path(
    patch,
    path = "/memory/long-term",
    request_body = LongTermPatchDto,
    responses(
        (status = 200, description = "Updated long-term memory", body = ApiResponse<MemoryDocumentDto>),
        (status = 400, description = "Body is not a JSON object"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "memory",
    security(("bearer_auth" = []))
)]
pub async fn update_long_term(
    user: AuthenticatedUser,
    State(store): State<Arc<MemoryStore>>,
    AppJson(LongTermPatchDto(patch)): AppJson<LongTermPatchDto>,
) -> Result<Json<ApiResponse<MemoryDocumentDto>>> {
    let doc = store.merge_long_term(user.user_id, patch).await?;
    Ok(Json(ApiResponse::success(
        Some(MemoryDocumentDto {
            document: Value::Object(doc),
        }),
        Some("Long-term memory updated".to_string()),
        None,
    )))
}

/// Reset short-term memory to its empty document
#[utoipa::path(
    delete,
    path = "/memory/short-term",
    responses(
        (status = 200, description = "Short-term memory cleared", body = ApiResponse<MemoryDocumentDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "memory",
    security(("bearer_auth" = []))
)]
pub async fn clear_short_term(
    user: AuthenticatedUser,
    State(store): State<Arc<MemoryStore>>,
) -> Result<Json<ApiResponse<MemoryDocumentDto>>> {
    let doc = store.clear(user.user_id, MemoryKind::ShortTerm).await?;
    tracing::info!(user_id = user.user_id, "Short-term memory cleared");

    Ok(Json(ApiResponse::success(
        Some(MemoryDocumentDto {
            document: Value::Object(doc),
        }),
        Some("Short-term memory cleared".to_string()),
        None,
    )))
}

/// Record the page the user is currently viewing
#[utoipa::path(
    post,
    path = "/active_url",
    request_body = ActiveUrlRequestDto,
    responses(
        (status = 200, description = "Active URL stored", body = StatusDto),
        (status = 400, description = "URL is required"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "memory",
    security(("bearer_auth" = []))
)]
pub async fn set_active_url(
    user: AuthenticatedUser,
    State(store): State<Arc<MemoryStore>>,
    AppJson(dto): AppJson<ActiveUrlRequestDto>,
) -> Result<Json<StatusDto>> {
    let url = dto
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL is required".to_string()))?;

    store
        .update_active_url(user.user_id, url, dto.title.as_deref())
        .await?;

    Ok(Json(StatusDto {
        status: "success".to_string(),
    }))
}
