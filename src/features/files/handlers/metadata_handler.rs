use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{FileMetadataDto, UpdateMetadataDto};
use crate::features::files::services::MetadataService;
use crate::shared::types::ApiResponse;

#[utoipa::path(
    get,
    path = "/files/{file_id}/metadata",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Key/value metadata", body = ApiResponse<FileMetadataDto>),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_metadata(
    user: AuthenticatedUser,
    State(service): State<Arc<MetadataService>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileMetadataDto>>, AppError> {
    let metadata = service.get(&user, file_id).await?;
    Ok(Json(ApiResponse::success(Some(metadata), None, None)))
}

/// Upsert metadata keys. Set `reference` to `"true"` to feed the file to the assistant.
#[utoipa::path(
    put,
    path = "/files/{file_id}/metadata",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    request_body = UpdateMetadataDto,
    responses(
        (status = 200, description = "Metadata after the update", body = ApiResponse<FileMetadataDto>),
        (status = 400, description = "Invalid key or value"),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn put_metadata(
    user: AuthenticatedUser,
    State(service): State<Arc<MetadataService>>,
    Path(file_id): Path<i64>,
    AppJson(UpdateMetadataDto(entries)): AppJson<UpdateMetadataDto>,
) -> Result<Json<ApiResponse<FileMetadataDto>>, AppError> {
    let metadata = service.upsert(&user, file_id, entries).await?;
    Ok(Json(ApiResponse::success(Some(metadata), None, None)))
}

#[utoipa::path(
    delete,
    path = "/files/{file_id}/metadata/{key}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID"),
        ("key" = String, Path, description = "Metadata key")
    ),
    responses(
        (status = 200, description = "Metadata after the removal", body = ApiResponse<FileMetadataDto>),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File or key not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_metadata(
    user: AuthenticatedUser,
    State(service): State<Arc<MetadataService>>,
    Path((file_id, key)): Path<(i64, String)>,
) -> Result<Json<ApiResponse<FileMetadataDto>>, AppError> {
    let metadata = service.delete(&user, file_id, &key).await?;
    Ok(Json(ApiResponse::success(Some(metadata), None, None)))
}
