use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{FileVersionsDto, UploadResponseDto};
use crate::features::files::handlers::file_handler::attachment;
use crate::features::files::services::FileService;
use crate::shared::types::ApiResponse;

/// List archived versions of a file, newest first
#[utoipa::path(
    get,
    path = "/files/{file_id}/versions",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Archived versions", body = ApiResponse<FileVersionsDto>),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_versions(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileVersionsDto>>, AppError> {
    let versions = service.versions(&user, file_id).await?;
    Ok(Json(ApiResponse::success(Some(versions), None, None)))
}

/// Download an archived version
#[utoipa::path(
    get,
    path = "/files/{file_id}/versions/{version}/download",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID"),
        ("version" = i32, Path, description = "Archived version number")
    ),
    responses(
        (status = 200, description = "Version bytes", content_type = "application/octet-stream"),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File or version not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_version(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path((file_id, version)): Path<(i64, i32)>,
) -> Result<Response, AppError> {
    let content = service.download_version(&user, file_id, version).await?;
    attachment(content)
}

/// Make an archived version current again
#[utoipa::path(
    post,
    path = "/files/{file_id}/versions/{version}/restore",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID"),
        ("version" = i32, Path, description = "Archived version number")
    ),
    responses(
        (status = 200, description = "Version restored as the new current version", body = ApiResponse<UploadResponseDto>),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File or version not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn restore_version(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path((file_id, version)): Path<(i64, i32)>,
) -> Result<Json<ApiResponse<UploadResponseDto>>, AppError> {
    let restored = service.restore_version(&user, file_id, version).await?;
    Ok(Json(ApiResponse::success(
        Some(restored),
        Some(format!("Restored version {}", version)),
        None,
    )))
}
