use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::queries::dtos::{
    QueryListParams, QueryRecordDto, QueryRequestDto, QueryResponseDto,
};
use crate::features::queries::services::QueryService;
use crate::shared::types::{ApiResponse, Meta};

/// Ask the assistant a question with the caller's memory and references as context
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequestDto,
    responses(
        (status = 200, description = "Assistant reply", body = ApiResponse<QueryResponseDto>),
        (status = 400, description = "Query is required or parameters out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Completion API failed")
    ),
    tag = "queries",
    security(("bearer_auth" = []))
)]
pub async fn ask(
    user: AuthenticatedUser,
    State(service): State<Arc<QueryService>>,
    AppJson(dto): AppJson<QueryRequestDto>,
) -> Result<Json<ApiResponse<QueryResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let answer = service.ask(&user, dto).await?;
    Ok(Json(ApiResponse::success(Some(answer), None, None)))
}

/// List the caller's past queries, newest first
#[utoipa::path(
    get,
    path = "/queries",
    params(QueryListParams),
    responses(
        (status = 200, description = "Past queries", body = ApiResponse<Vec<QueryRecordDto>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "queries",
    security(("bearer_auth" = []))
)]
pub async fn list_queries(
    user: AuthenticatedUser,
    State(service): State<Arc<QueryService>>,
    Query(params): Query<QueryListParams>,
) -> Result<Json<ApiResponse<Vec<QueryRecordDto>>>> {
    let (queries, total) = service.list(&user, &params).await?;
    Ok(Json(ApiResponse::success(
        Some(queries),
        None,
        Some(Meta { total }),
    )))
}

#[utoipa::path(
    get,
    path = "/queries/{query_id}",
    params(
        ("query_id" = i64, Path, description = "Query ID")
    ),
    responses(
        (status = 200, description = "Query with its response", body = ApiResponse<QueryRecordDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Query belongs to another user"),
        (status = 404, description = "Query not found")
    ),
    tag = "queries",
    security(("bearer_auth" = []))
)]
pub async fn get_query(
    user: AuthenticatedUser,
    State(service): State<Arc<QueryService>>,
    Path(query_id): Path<i64>,
) -> Result<Json<ApiResponse<QueryRecordDto>>> {
    let query = service.get(&user, query_id).await?;
    Ok(Json(ApiResponse::success(Some(query), None, None)))
}
